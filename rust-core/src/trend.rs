//! Sentiment trend helpers: trailing moving averages, per-day aggregation and
//! label summaries.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{ScoredPost, SentimentLabel};
use crate::sentiment::SentimentClassifier;

/// Trailing simple moving average. A position is `None` until a full
/// window is available, and while any value in its window is missing.
pub fn rolling_mean<S>(values: &[S], window: usize) -> Vec<Option<f64>>
where
    S: Copy + Into<Option<f64>>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let values: Vec<Option<f64>> = values.iter().map(|&v| v.into()).collect();
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut missing = 0usize;
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => sum += v,
            None => missing += 1,
        }
        if i >= window {
            match values[i - window] {
                Some(old) => sum -= old,
                None => missing -= 1,
            }
        }
        if i + 1 >= window && missing == 0 {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Mean of the defined values, `None` if there are none.
pub(crate) fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Running sum over the values that are present.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean polarity components and post count for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub mean_compound: f64,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_positive: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_negative: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_neutral: Option<f64>,
}

#[derive(Default)]
struct DayTotals {
    compound: Accumulator,
    positive: Accumulator,
    negative: Accumulator,
    neutral: Accumulator,
}

/// Per-day averages, oldest first. Posts lacking a timestamp or a compound
/// score are skipped; a component no post of the day carries is `None`.
pub fn daily_trend(posts: &[ScoredPost]) -> Vec<DailySentiment> {
    let mut by_day: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for post in posts {
        if let (Some(ts), Some(c)) = (post.timestamp, post.compound_score) {
            let day = by_day.entry(ts.date()).or_default();
            day.compound.add(Some(c));
            day.positive.add(post.positive_score);
            day.negative.add(post.negative_score);
            day.neutral.add(post.neutral_score);
        }
    }
    by_day
        .into_iter()
        .map(|(date, day)| DailySentiment {
            date,
            mean_compound: day.compound.mean().unwrap_or(0.0),
            count: day.compound.count,
            mean_positive: day.positive.mean(),
            mean_negative: day.negative.mean(),
            mean_neutral: day.neutral.mean(),
        })
        .collect()
}

/// Which end of the compound scale [`top_sentiments`] takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// One post from either extreme of the compound scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSentiment {
    pub id: String,
    pub text: String,
    pub compound_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

/// The `n` most positive (highest compound first) or most negative (lowest
/// first) posts. Posts without a compound score are skipped; equal scores
/// keep batch order.
pub fn top_sentiments(posts: &[ScoredPost], n: usize, direction: Direction) -> Vec<TopSentiment> {
    let mut scored: Vec<(&ScoredPost, f64)> = posts
        .iter()
        .filter_map(|p| Some((p, p.compound_score?)))
        .collect();
    match direction {
        Direction::Positive => scored.sort_by(|a, b| b.1.total_cmp(&a.1)),
        Direction::Negative => scored.sort_by(|a, b| a.1.total_cmp(&b.1)),
    }
    scored
        .into_iter()
        .take(n)
        .map(|(post, compound_score)| TopSentiment {
            id: post.id.clone(),
            text: post.text.clone(),
            compound_score,
            sentiment: post.sentiment,
            segment: post.segment.clone(),
            timestamp: post.timestamp,
        })
        .collect()
}

/// Label counts, percentages and mean compound over a set of posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub total: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
    pub avg_compound_score: f64,
    pub avg_positive_score: f64,
    pub avg_negative_score: f64,
    pub avg_neutral_score: f64,
}

impl SentimentSummary {
    pub fn from_posts<'a, I>(posts: I, classifier: &SentimentClassifier) -> Self
    where
        I: IntoIterator<Item = &'a ScoredPost>,
    {
        let mut summary = Self::default();
        let mut compound = Accumulator::default();
        let mut positive = Accumulator::default();
        let mut negative = Accumulator::default();
        let mut neutral = Accumulator::default();
        for post in posts {
            summary.total += 1;
            compound.add(post.compound_score);
            positive.add(post.positive_score);
            negative.add(post.negative_score);
            neutral.add(post.neutral_score);
            match classifier.label_of(post) {
                Some(SentimentLabel::Positive) => summary.positive_count += 1,
                Some(SentimentLabel::Negative) => summary.negative_count += 1,
                Some(SentimentLabel::Neutral) => summary.neutral_count += 1,
                None => {}
            }
        }
        if summary.total > 0 {
            let total = summary.total as f64;
            summary.positive_percentage = summary.positive_count as f64 / total * 100.0;
            summary.negative_percentage = summary.negative_count as f64 / total * 100.0;
            summary.neutral_percentage = summary.neutral_count as f64 / total * 100.0;
        }
        summary.avg_compound_score = compound.mean().unwrap_or(0.0);
        summary.avg_positive_score = positive.mean().unwrap_or(0.0);
        summary.avg_negative_score = negative.mean().unwrap_or(0.0);
        summary.avg_neutral_score = neutral.mean().unwrap_or(0.0);
        summary
    }
}

/// Summaries per segment, in first-appearance order. Posts without a
/// segment are left out.
pub fn summarize_by_segment(
    posts: &[ScoredPost],
    classifier: &SentimentClassifier,
) -> Vec<(String, SentimentSummary)> {
    let mut order: Vec<&str> = Vec::new();
    for segment in posts.iter().filter_map(|p| p.segment.as_deref()) {
        if !order.contains(&segment) {
            order.push(segment);
        }
    }
    order
        .into_iter()
        .map(|segment| {
            let members = posts.iter().filter(|p| p.segment.as_deref() == Some(segment));
            (segment.to_string(), SentimentSummary::from_posts(members, classifier))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;

    fn post(segment: &str, ts: &str, compound: f64) -> ScoredPost {
        ScoredPost {
            id: format!("{segment}@{ts}"),
            segment: Some(segment.to_string()),
            timestamp: parse_timestamp(ts),
            compound_score: Some(compound),
            ..Default::default()
        }
    }

    fn with_components(mut post: ScoredPost, pos: f64, neu: f64, neg: f64) -> ScoredPost {
        post.positive_score = Some(pos);
        post.neutral_score = Some(neu);
        post.negative_score = Some(neg);
        post
    }

    #[test]
    fn test_rolling_mean() {
        let r = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(r, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert_eq!(mean_defined(&r[..2]), Some(1.5));
        assert_eq!(mean_defined(&r[..1]), None);
    }

    #[test]
    fn test_rolling_mean_gap_blanks_its_windows() {
        let r = rolling_mean(&[Some(1.0), None, Some(3.0), Some(5.0), Some(7.0)], 2);
        assert_eq!(r, vec![None, None, None, Some(4.0), Some(6.0)]);
    }

    #[test]
    fn test_daily_trend() {
        let posts = vec![
            post("x", "2024-01-02 08:00:00", -0.5),
            post("x", "2024-01-01 09:00:00", 0.4),
            post("x", "2024-01-02 18:00:00", 0.1),
        ];
        let trend = daily_trend(&posts);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].count, 1);
        assert_eq!(trend[1].count, 2);
        assert!((trend[1].mean_compound + 0.2).abs() < 1e-12);
        assert_eq!(trend[0].mean_positive, None);
    }

    #[test]
    fn test_daily_trend_component_means() {
        let posts = vec![
            with_components(post("x", "2024-01-01 08:00:00", 0.5), 0.6, 0.4, 0.0),
            with_components(post("x", "2024-01-01 20:00:00", -0.5), 0.0, 0.4, 0.6),
            post("x", "2024-01-01 21:00:00", 0.0),
        ];
        let trend = daily_trend(&posts);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].count, 3);
        assert_eq!(trend[0].mean_positive, Some(0.3));
        assert_eq!(trend[0].mean_negative, Some(0.3));
        assert_eq!(trend[0].mean_neutral, Some(0.4));
    }

    #[test]
    fn test_summary_component_averages() {
        let posts = vec![
            with_components(post("x", "2024-01-01", 0.8), 0.7, 0.3, 0.0),
            with_components(post("x", "2024-01-01", -0.8), 0.1, 0.3, 0.6),
        ];
        let summary = SentimentSummary::from_posts(&posts, &SentimentClassifier::default());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.avg_compound_score, 0.0);
        assert!((summary.avg_positive_score - 0.4).abs() < 1e-12);
        assert!((summary.avg_neutral_score - 0.3).abs() < 1e-12);
        assert!((summary.avg_negative_score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_top_sentiments_both_directions() {
        let mut unscored = post("Reddit", "2024-01-03", 0.0);
        unscored.compound_score = None;
        let posts = vec![
            post("Twitter", "2024-01-01", 0.2),
            post("Reddit", "2024-01-02", -0.9),
            unscored,
            post("Twitter", "2024-01-04", 0.9),
            post("Facebook", "2024-01-05", -0.9),
        ];

        let top: Vec<f64> = top_sentiments(&posts, 2, Direction::Positive)
            .iter()
            .map(|t| t.compound_score)
            .collect();
        assert_eq!(top, vec![0.9, 0.2]);

        let bottom = top_sentiments(&posts, 10, Direction::Negative);
        assert_eq!(bottom.len(), 4);
        assert_eq!(bottom[0].segment.as_deref(), Some("Reddit"));
        assert_eq!(bottom[1].segment.as_deref(), Some("Facebook"));
        assert_eq!(bottom[0].timestamp, parse_timestamp("2024-01-02"));
        assert!(top_sentiments(&posts, 0, Direction::Negative).is_empty());
    }

    #[test]
    fn test_summary_by_segment() {
        let posts = vec![
            post("Twitter", "2024-01-01", -0.6),
            post("Reddit", "2024-01-01", 0.6),
            post("Twitter", "2024-01-01", 0.0),
        ];
        let by_segment = summarize_by_segment(&posts, &SentimentClassifier::default());
        assert_eq!(by_segment[0].0, "Twitter");
        assert_eq!(by_segment[0].1.total, 2);
        assert_eq!(by_segment[0].1.negative_count, 1);
        assert_eq!(by_segment[0].1.neutral_count, 1);
        assert_eq!(by_segment[0].1.negative_percentage, 50.0);
        assert_eq!(by_segment[1].1.positive_count, 1);
    }
}
