//! Sentiment anomaly alerts: sliding-window spikes, moving-average drops and
//! per-segment negativity rates.
//!
//! Every detector needs the complete, ordered sequence before scanning; a
//! later element can change which windows qualify, so nothing here is
//! incremental.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::config::AlertConfig;
use crate::errors::{TriageError, TriageResult};
use crate::models::{ScoredPost, SentimentLabel};
use crate::sentiment::SentimentClassifier;
use crate::trend::{mean_defined, rolling_mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
    Medium,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
        })
    }
}

/// Numeric evidence behind an alert, tagged by alert type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AlertEvidence {
    Spike {
        start_index: usize,
        end_index: usize,
        negative_count: usize,
        negative_ratio: f64,
        avg_compound_score: f64,
    },
    Drop {
        timestamp: NaiveDateTime,
        previous_avg: f64,
        current_avg: f64,
        drop_magnitude: f64,
    },
    SegmentAlert {
        segment: String,
        negative_percentage: f64,
        negative_count: usize,
        total_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub severity: Severity,
    pub message: String,
    #[serde(flatten)]
    pub evidence: AlertEvidence,
}

impl AlertEvent {
    pub fn kind(&self) -> &'static str {
        match self.evidence {
            AlertEvidence::Spike { .. } => "Negative Spike Detected",
            AlertEvidence::Drop { .. } => "Sentiment Drop Detected",
            AlertEvidence::SegmentAlert { .. } => "Segment Alert",
        }
    }
}

/// Slide a `window`-wide window with step 1 over `scores` and emit a High
/// spike wherever the share of values strictly below `negative_threshold`
/// reaches `min_ratio`. Overlapping windows each emit; nothing is merged.
///
/// A missing score still occupies its position but never counts as
/// negative and is left out of the window mean.
pub fn detect_spike<S>(
    scores: &[S],
    window: usize,
    negative_threshold: f64,
    min_ratio: f64,
) -> Vec<AlertEvent>
where
    S: Copy + Into<Option<f64>>,
{
    if window == 0 || scores.len() < window {
        return Vec::new();
    }
    let scores: Vec<Option<f64>> = scores.iter().map(|&s| s.into()).collect();

    scores
        .windows(window)
        .enumerate()
        .filter_map(|(start, slice)| {
            let negative_count = slice
                .iter()
                .flatten()
                .filter(|&&s| s < negative_threshold)
                .count();
            let negative_ratio = negative_count as f64 / window as f64;
            if negative_ratio < min_ratio {
                return None;
            }
            Some(AlertEvent {
                severity: Severity::High,
                message: format!(
                    "Detected {negative_count}/{window} highly negative comments (ratio: {:.1}%) in consecutive window",
                    negative_ratio * 100.0
                ),
                evidence: AlertEvidence::Spike {
                    start_index: start,
                    end_index: start + window - 1,
                    negative_count,
                    negative_ratio,
                    avg_compound_score: mean_defined(slice).unwrap_or(0.0),
                },
            })
        })
        .collect()
}

/// Compare trailing moving averages before and after each point of a
/// time-ordered series and emit a Medium alert when the earlier mean exceeds
/// the later by at least `drop_threshold`.
///
/// Needs at least `2 * window` points; shorter series yield nothing. A
/// missing score leaves every moving average covering it undefined.
pub fn detect_drop<S>(
    series: &[(NaiveDateTime, S)],
    drop_threshold: f64,
    window: usize,
) -> Vec<AlertEvent>
where
    S: Copy + Into<Option<f64>>,
{
    if window == 0 || series.len() < window * 2 {
        return Vec::new();
    }

    let mut sorted: Vec<(NaiveDateTime, Option<f64>)> =
        series.iter().map(|&(ts, s)| (ts, s.into())).collect();
    sorted.sort_by_key(|(ts, _)| *ts);
    let scores: Vec<Option<f64>> = sorted.iter().map(|(_, s)| *s).collect();
    let rolling = rolling_mean(&scores, window);

    let mut alerts = Vec::new();
    for i in window..sorted.len() - window {
        let (Some(previous_avg), Some(current_avg)) = (
            mean_defined(&rolling[i - window..i]),
            mean_defined(&rolling[i..i + window]),
        ) else {
            continue;
        };
        let drop_magnitude = previous_avg - current_avg;
        if drop_magnitude >= drop_threshold {
            alerts.push(AlertEvent {
                severity: Severity::Medium,
                message: format!(
                    "Sentiment dropped by {drop_magnitude:.2} (from {previous_avg:.2} to {current_avg:.2})"
                ),
                evidence: AlertEvidence::Drop {
                    timestamp: sorted[i].0,
                    previous_avg,
                    current_avg,
                    drop_magnitude,
                },
            });
        }
    }
    alerts
}

/// Emit a Medium alert for each segment whose share of Negative posts reaches
/// `pct_threshold` percent. Segments with fewer than `min_sample` posts are
/// skipped. Segments are visited in first-appearance order.
pub fn aggregate_by_segment(
    labelled: &[(&str, Option<SentimentLabel>)],
    min_sample: usize,
    pct_threshold: f64,
) -> Vec<AlertEvent> {
    let mut segments: Vec<(&str, usize, usize)> = Vec::new();
    for &(segment, label) in labelled {
        let idx = match segments.iter().position(|(s, _, _)| *s == segment) {
            Some(idx) => idx,
            None => {
                segments.push((segment, 0, 0));
                segments.len() - 1
            }
        };
        segments[idx].1 += 1;
        if label == Some(SentimentLabel::Negative) {
            segments[idx].2 += 1;
        }
    }

    segments
        .into_iter()
        .filter(|(_, total, _)| *total >= min_sample)
        .filter_map(|(segment, total, negative_count)| {
            let negative_percentage = negative_count as f64 / total as f64 * 100.0;
            if negative_percentage < pct_threshold {
                return None;
            }
            Some(AlertEvent {
                severity: Severity::Medium,
                message: format!(
                    "{segment} has {negative_percentage:.1}% negative sentiment ({negative_count}/{total} posts)"
                ),
                evidence: AlertEvidence::SegmentAlert {
                    segment: segment.to_string(),
                    negative_percentage,
                    negative_count,
                    total_count: total,
                },
            })
        })
        .collect()
}

/// Most negative post flagged for follow-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighPriorityPost {
    pub id: String,
    pub text: String,
    pub compound_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertReport {
    pub generated_at: DateTime<Utc>,
    pub total_analyzed: usize,
    pub alerts: Vec<AlertEvent>,
    pub alert_count: usize,
    pub has_critical_alert: bool,
    pub high_priority_count: usize,
    /// Lowest compound scores first, truncated to the configured limit.
    pub high_priority: Vec<HighPriorityPost>,
}

/// Runs all detectors over a batch of scored posts.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    config: AlertConfig,
    classifier: SentimentClassifier,
}

impl AlertEngine {
    pub fn new(config: AlertConfig, classifier: SentimentClassifier) -> TriageResult<Self> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Compound scores in batch order, or `None` if no post carries one.
    fn compound_series(posts: &[ScoredPost], detector: &str) -> Option<Vec<Option<f64>>> {
        let scores: Vec<Option<f64>> = posts.iter().map(|p| p.compound_score).collect();
        let missing = scores.iter().filter(|s| s.is_none()).count();
        if missing == scores.len() {
            if !posts.is_empty() {
                tracing::warn!(posts = posts.len(), detector, "no compound scores present; detection skipped");
            }
            return None;
        }
        if missing > 0 {
            tracing::warn!(missing, detector, "posts without a compound score count as not negative");
        }
        Some(scores)
    }

    pub fn spike_alerts(&self, posts: &[ScoredPost]) -> Vec<AlertEvent> {
        let Some(scores) = Self::compound_series(posts, "spike") else {
            return Vec::new();
        };
        detect_spike(
            &scores,
            self.config.spike_window,
            self.config.spike_negative_threshold,
            self.config.spike_min_ratio,
        )
    }

    /// Drop detection over the batch's timestamps. A post without a
    /// timestamp makes the ordering undefined and is an error.
    pub fn drop_alerts(&self, posts: &[ScoredPost]) -> TriageResult<Vec<AlertEvent>> {
        let mut series = Vec::with_capacity(posts.len());
        for post in posts {
            let timestamp = post.timestamp.ok_or_else(|| TriageError::MissingField {
                record_id: post.id.clone(),
                field: "timestamp",
            })?;
            series.push(timestamp);
        }
        let Some(scores) = Self::compound_series(posts, "drop") else {
            return Ok(Vec::new());
        };
        let series: Vec<(NaiveDateTime, Option<f64>)> = series.into_iter().zip(scores).collect();
        Ok(detect_drop(
            &series,
            self.config.drop_threshold,
            self.config.drop_window,
        ))
    }

    pub fn segment_alerts(&self, posts: &[ScoredPost]) -> Vec<AlertEvent> {
        let labelled: Vec<(&str, Option<SentimentLabel>)> = posts
            .iter()
            .filter_map(|p| Some((p.segment.as_deref()?, self.classifier.label_of(p))))
            .collect();
        if labelled.is_empty() && !posts.is_empty() {
            tracing::warn!("no segment field present; segment aggregation skipped");
        }
        aggregate_by_segment(
            &labelled,
            self.config.segment_min_sample,
            self.config.segment_pct_threshold,
        )
    }

    /// Posts scoring below the spike threshold, most negative first.
    pub fn high_priority(&self, posts: &[ScoredPost]) -> Vec<HighPriorityPost> {
        let mut flagged: Vec<HighPriorityPost> = posts
            .iter()
            .filter_map(|p| {
                let compound_score = p.compound_score?;
                (compound_score < self.config.spike_negative_threshold).then(|| HighPriorityPost {
                    id: p.id.clone(),
                    text: p.text.clone(),
                    compound_score,
                    segment: p.segment.clone(),
                    timestamp: p.timestamp,
                })
            })
            .collect();
        flagged.sort_by(|a, b| a.compound_score.total_cmp(&b.compound_score));
        flagged
    }

    pub fn build_report(&self, posts: &[ScoredPost]) -> TriageResult<AlertReport> {
        self.build_report_at(posts, Utc::now())
    }

    /// Spikes, then drops (if the batch carries timestamps), then segment
    /// alerts (if it carries segments), in that order.
    pub fn build_report_at(
        &self,
        posts: &[ScoredPost],
        generated_at: DateTime<Utc>,
    ) -> TriageResult<AlertReport> {
        let mut alerts = self.spike_alerts(posts);

        if posts.iter().any(|p| p.timestamp.is_some()) {
            alerts.extend(self.drop_alerts(posts)?);
        }
        if posts.iter().any(|p| p.segment.is_some()) {
            alerts.extend(self.segment_alerts(posts));
        }

        let mut high_priority = self.high_priority(posts);
        let high_priority_count = high_priority.len();
        high_priority.truncate(self.config.high_priority_limit);

        let alert_count = alerts.len();
        let has_critical_alert = alerts.iter().any(|a| a.severity == Severity::High);
        tracing::info!(
            total = posts.len(),
            alerts = alert_count,
            high_priority = high_priority_count,
            critical = has_critical_alert,
            "alert report built"
        );

        Ok(AlertReport {
            generated_at,
            total_analyzed: posts.len(),
            alerts,
            alert_count,
            has_critical_alert,
            high_priority_count,
            high_priority,
        })
    }
}

impl AlertReport {
    /// Whether anything needs attention, with a one-line summary. High-priority
    /// comments count even when no detector fired.
    pub fn quick_check(&self) -> (bool, String) {
        let flagged = self.alert_count > 0 || self.high_priority_count > 0;
        if !flagged {
            return (false, "No alerts - sentiment appears normal".to_string());
        }
        let mut message = format!("{} alerts detected", self.alert_count);
        if self.high_priority_count > 0 {
            message.push_str(&format!(", {} high priority comments", self.high_priority_count));
        }
        (true, message)
    }
}

impl fmt::Display for AlertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);
        writeln!(f, "{rule}")?;
        writeln!(f, "SENTIMENT ALERT SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Generated: {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "Total Posts Analyzed: {}", self.total_analyzed)?;
        writeln!(f, "Total Alerts: {}", self.alert_count)?;
        writeln!(f)?;

        if self.has_critical_alert {
            writeln!(f, "!! CRITICAL ALERTS DETECTED !!")?;
            writeln!(f)?;
        }

        if self.alerts.is_empty() {
            writeln!(f, "No alerts detected - sentiment appears normal")?;
            writeln!(f)?;
        } else {
            writeln!(f, "ALERTS:")?;
            writeln!(f, "{thin}")?;
            for (i, alert) in self.alerts.iter().enumerate() {
                writeln!(f, "{}. [{}] {}", i + 1, alert.severity, alert.kind())?;
                writeln!(f, "   {}", alert.message)?;
                writeln!(f)?;
            }
        }

        if self.high_priority_count > 0 {
            writeln!(f, "HIGH PRIORITY COMMENTS: {}", self.high_priority_count)?;
            writeln!(f, "{thin}")?;
            for (i, post) in self.high_priority.iter().take(5).enumerate() {
                let preview: String = post.text.chars().take(100).collect();
                writeln!(f, "{}. Score: {:.3}", i + 1, post.compound_score)?;
                writeln!(f, "   {preview}...")?;
                writeln!(f)?;
            }
        }

        write!(f, "{rule}")
    }
}
