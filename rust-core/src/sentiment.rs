//! Boundary to the external polarity model.
//!
//! The lexicon model lives outside this crate. It is consumed only through
//! [`PolarityScorer`]; alerting never sees anything but the compound score
//! and the label derived from it.

use serde::{Deserialize, Serialize};

use crate::config::SentimentThresholds;
use crate::models::{ScoredPost, SentimentLabel, SocialPost};

/// Output contract of the polarity model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    /// Aggregate polarity in `[-1, 1]`.
    pub compound: f64,
    pub pos: f64,
    pub neu: f64,
    pub neg: f64,
}

impl PolarityScores {
    /// Score reported for blank text.
    pub const NEUTRAL: PolarityScores = PolarityScores {
        compound: 0.0,
        pos: 0.0,
        neu: 1.0,
        neg: 0.0,
    };

    /// Clamp every component into its documented range. NaN reads as neutral.
    pub fn sanitized(self) -> Self {
        fn unit(v: f64, fallback: f64) -> f64 {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Self {
            compound: if self.compound.is_nan() { 0.0 } else { self.compound.clamp(-1.0, 1.0) },
            pos: unit(self.pos, 0.0),
            neu: unit(self.neu, 1.0),
            neg: unit(self.neg, 0.0),
        }
    }
}

/// A text → polarity function supplied by the caller.
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> PolarityScores;
}

impl<F> PolarityScorer for F
where
    F: Fn(&str) -> PolarityScores + Send + Sync,
{
    fn polarity(&self, text: &str) -> PolarityScores {
        self(text)
    }
}

/// Maps compound scores to labels.
#[derive(Debug, Clone, Copy)]
pub struct SentimentClassifier {
    thresholds: SentimentThresholds,
}

impl SentimentClassifier {
    pub fn new(thresholds: SentimentThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, compound: f64) -> SentimentLabel {
        if compound >= self.thresholds.positive {
            SentimentLabel::Positive
        } else if compound <= self.thresholds.negative {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Label for a post: its own label if present, else one derived from
    /// its compound score.
    pub fn label_of(&self, post: &ScoredPost) -> Option<SentimentLabel> {
        post.sentiment.or_else(|| post.compound_score.map(|c| self.classify(c)))
    }

    /// Score one text. Blank text is neutral without consulting the model.
    pub fn score_text(&self, scorer: &dyn PolarityScorer, text: &str) -> PolarityScores {
        if text.trim().is_empty() {
            return PolarityScores::NEUTRAL;
        }
        scorer.polarity(text).sanitized()
    }

    /// Score and label a batch of posts, preserving order.
    pub fn annotate(&self, scorer: &dyn PolarityScorer, posts: &[SocialPost]) -> Vec<ScoredPost> {
        posts
            .iter()
            .map(|post| {
                let scores = self.score_text(scorer, &post.text);
                ScoredPost {
                    id: post.id.clone(),
                    author: post.author.clone(),
                    text: post.text.clone(),
                    segment: post.segment.clone(),
                    timestamp: post.timestamp,
                    compound_score: Some(scores.compound),
                    positive_score: Some(scores.pos),
                    negative_score: Some(scores.neg),
                    neutral_score: Some(scores.neu),
                    sentiment: Some(self.classify(scores.compound)),
                }
            })
            .collect()
    }
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self::new(SentimentThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(compound: f64) -> impl Fn(&str) -> PolarityScores + Send + Sync {
        move |_: &str| PolarityScores {
            compound,
            pos: 0.1,
            neu: 0.8,
            neg: 0.1,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        let c = SentimentClassifier::default();
        assert_eq!(c.classify(0.05), SentimentLabel::Positive);
        assert_eq!(c.classify(0.0499), SentimentLabel::Neutral);
        assert_eq!(c.classify(-0.05), SentimentLabel::Negative);
        assert_eq!(c.classify(-0.9), SentimentLabel::Negative);
    }

    #[test]
    fn test_blank_text_skips_model() {
        let c = SentimentClassifier::default();
        let scorer = |_: &str| -> PolarityScores { panic!("model must not be called") };
        assert_eq!(c.score_text(&scorer, "   "), PolarityScores::NEUTRAL);
    }

    #[test]
    fn test_out_of_range_scores_clamped() {
        let c = SentimentClassifier::default();
        let s = c.score_text(&fixed(-3.0), "awful");
        assert_eq!(s.compound, -1.0);
    }

    #[test]
    fn test_annotate_labels_posts() {
        let c = SentimentClassifier::default();
        let posts = vec![SocialPost {
            id: "p1".into(),
            author: "a".into(),
            text: "terrible service".into(),
            segment: Some("Twitter".into()),
            timestamp: None,
        }];
        let scored = c.annotate(&fixed(-0.6), &posts);
        assert_eq!(scored[0].compound_score, Some(-0.6));
        assert_eq!(scored[0].positive_score, Some(0.1));
        assert_eq!(scored[0].neutral_score, Some(0.8));
        assert_eq!(scored[0].negative_score, Some(0.1));
        assert_eq!(scored[0].sentiment, Some(SentimentLabel::Negative));
        assert_eq!(scored[0].segment.as_deref(), Some("Twitter"));
    }

    #[test]
    fn test_label_prefers_explicit() {
        let c = SentimentClassifier::default();
        let post = ScoredPost {
            compound_score: Some(0.9),
            sentiment: Some(SentimentLabel::Negative),
            ..Default::default()
        };
        assert_eq!(c.label_of(&post), Some(SentimentLabel::Negative));
    }
}
