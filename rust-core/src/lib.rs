//! Triage core: urgency scoring, severity tiers, priority ranking and
//! sentiment anomaly alerts for message streams.
//! Scoring is pure and stateless; engines hold only their immutable config.

mod anomaly;
mod config;
mod errors;
mod keywords;
mod models;
mod preprocess;
mod ranking;
mod sentiment;
mod tracing_setup;
mod trend;
mod urgency;

pub use anomaly::{
    aggregate_by_segment, detect_drop, detect_spike, AlertEngine, AlertEvent, AlertEvidence,
    AlertReport, HighPriorityPost, Severity,
};
pub use config::{
    AlertConfig, CategoryConfig, EngineConfig, ScoringConfig, SentimentThresholds,
    TierThresholds, ACTION_CATEGORY, TIME_CATEGORY,
};
pub use errors::{ConfigError, TriageError, TriageResult};
pub use keywords::{KeywordMatch, WeightEntry, WeightTable};
pub use models::{
    parse_timestamp, ClassifiedRecord, Record, ScoreBreakdown, ScoredPost, SentimentLabel,
    SocialPost, Tier,
};
pub use preprocess::{normalize, normalize_opt};
pub use ranking::{rank, top_n};
pub use sentiment::{PolarityScorer, PolarityScores, SentimentClassifier};
pub use tracing_setup::init_tracing;
pub use trend::{
    daily_trend, rolling_mean, summarize_by_segment, top_sentiments, DailySentiment, Direction,
    SentimentSummary, TopSentiment,
};
pub use urgency::{TierCounts, UrgencyAssessment, UrgencyEngine};
