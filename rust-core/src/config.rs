//! Engine configuration with layered resolution.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`TRIAGE_*`, alert knobs only)
//! 2. TOML file passed to [`EngineConfig::load`]
//! 3. Compiled defaults
//!
//! The resolved value is immutable; engines take it by reference at
//! construction and never consult process-wide state afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::keywords::{canonical_entries, WeightEntry};

pub const TIME_CATEGORY: &str = "time";
pub const ACTION_CATEGORY: &str = "action";

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub alerts: AlertConfig,
    pub sentiment: SentimentThresholds,
}

/// One named urgency category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    pub name: String,
    pub phrases: BTreeMap<String, u32>,
}

/// Keyword tables, caps and tier thresholds for urgency scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Scanned critical, high, medium, then other categories by name,
    /// before time and action keywords.
    pub categories: Vec<CategoryConfig>,
    pub time_keywords: BTreeMap<String, u32>,
    pub action_keywords: BTreeMap<String, u32>,
    pub body_cap: u32,
    pub subject_cap: u32,
    pub max_score: u32,
    pub tiers: TierThresholds,
}

/// Lower bound of each tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TierThresholds {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Anomaly detection knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub spike_window: usize,
    pub spike_negative_threshold: f64,
    pub spike_min_ratio: f64,
    pub drop_window: usize,
    pub drop_threshold: f64,
    pub segment_min_sample: usize,
    pub segment_pct_threshold: f64,
    pub high_priority_limit: usize,
}

/// Compound-score cut-offs for sentiment labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentThresholds {
    pub positive: f64,
    pub negative: f64,
}

fn phrases(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
    pairs.iter().map(|(p, w)| ((*p).to_string(), *w)).collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let critical = phrases(&[
            ("urgent", 15),
            ("asap", 15),
            ("immediately", 15),
            ("emergency", 15),
            ("critical", 15),
            ("now", 15),
        ]);
        let high = phrases(&[
            ("soon", 12),
            ("quickly", 12),
            ("time-sensitive", 12),
            ("deadline", 12),
            ("urgent need", 12),
            ("expire", 12),
            ("expires", 12),
            ("expiring", 12),
            ("time constraint", 12),
        ]);
        let medium = phrases(&[
            ("please", 8),
            ("need", 8),
            ("important", 8),
            ("waiting", 8),
            ("required", 8),
            ("necessary", 8),
            ("response", 8),
            ("follow up", 8),
            ("follow-up", 8),
        ]);
        Self {
            categories: vec![
                CategoryConfig { name: "critical".into(), phrases: critical },
                CategoryConfig { name: "high".into(), phrases: high },
                CategoryConfig { name: "medium".into(), phrases: medium },
            ],
            time_keywords: phrases(&[
                ("today", 12),
                ("by eod", 12),
                ("end of day", 12),
                ("within 24 hours", 12),
                ("by 5pm", 12),
                ("by 5 pm", 12),
                ("this afternoon", 12),
                ("this morning", 12),
                ("by noon", 12),
                ("within hours", 12),
                ("within hour", 12),
            ]),
            action_keywords: phrases(&[
                ("call me", 8),
                ("need response", 8),
                ("please respond", 8),
                ("get back", 8),
                ("respond asap", 8),
                ("waiting for", 8),
                ("need to know", 8),
                ("let me know", 8),
                ("confirm", 8),
                ("approval needed", 8),
            ]),
            body_cap: 70,
            subject_cap: 30,
            max_score: 100,
            tiers: TierThresholds::default(),
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            critical: 76,
            high: 51,
            medium: 26,
            low: 0,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            spike_window: 10,
            spike_negative_threshold: -0.5,
            spike_min_ratio: 0.7,
            drop_window: 5,
            drop_threshold: 0.3,
            segment_min_sample: 5,
            segment_pct_threshold: 50.0,
            high_priority_limit: 10,
        }
    }
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            positive: 0.05,
            negative: -0.05,
        }
    }
}

impl ScoringConfig {
    /// Flatten all tables into `(category, phrase, weight)` entries:
    /// configured categories, then time, then action keywords. Scan order is
    /// fixed later by the weight table.
    pub fn entries(&self) -> Vec<WeightEntry> {
        let mut entries = Vec::new();
        for category in &self.categories {
            push_table(&mut entries, &category.name, &category.phrases);
        }
        push_table(&mut entries, TIME_CATEGORY, &self.time_keywords);
        push_table(&mut entries, ACTION_CATEGORY, &self.action_keywords);
        entries
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_score == 0 {
            return Err(ConfigError::invalid("scoring.max_score", "must be greater than 0"));
        }
        if self.body_cap > self.max_score {
            return Err(ConfigError::invalid("scoring.body_cap", "must not exceed max_score"));
        }
        if self.subject_cap > self.max_score {
            return Err(ConfigError::invalid("scoring.subject_cap", "must not exceed max_score"));
        }
        let mut names: Vec<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        names.push(TIME_CATEGORY);
        names.push(ACTION_CATEGORY);
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != names.len() {
            return Err(ConfigError::invalid("scoring.categories", "category names must be unique"));
        }
        self.tiers.validate(self.max_score)?;
        canonical_entries(self.entries())?;
        Ok(())
    }
}

fn push_table(entries: &mut Vec<WeightEntry>, category: &str, table: &BTreeMap<String, u32>) {
    entries.extend(table.iter().map(|(phrase, weight)| WeightEntry {
        category: category.to_string(),
        phrase: phrase.clone(),
        weight: *weight,
    }));
}

impl TierThresholds {
    /// Bounds must start at 0, increase strictly, and stay within `max_score`
    /// so the four tiers partition `[0, max_score]` without gaps.
    pub fn validate(&self, max_score: u32) -> Result<(), ConfigError> {
        if self.low != 0 {
            return Err(ConfigError::invalid("scoring.tiers.low", "must be 0"));
        }
        if self.medium <= self.low {
            return Err(ConfigError::invalid("scoring.tiers.medium", "must be greater than low"));
        }
        if self.high <= self.medium {
            return Err(ConfigError::invalid("scoring.tiers.high", "must be greater than medium"));
        }
        if self.critical <= self.high {
            return Err(ConfigError::invalid("scoring.tiers.critical", "must be greater than high"));
        }
        if self.critical > max_score {
            return Err(ConfigError::invalid(
                "scoring.tiers.critical",
                format!("must not exceed max_score ({max_score})"),
            ));
        }
        Ok(())
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spike_window == 0 {
            return Err(ConfigError::invalid("alerts.spike_window", "must be greater than 0"));
        }
        if self.drop_window == 0 {
            return Err(ConfigError::invalid("alerts.drop_window", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.spike_min_ratio) {
            return Err(ConfigError::invalid("alerts.spike_min_ratio", "must be between 0.0 and 1.0"));
        }
        if !(-1.0..=1.0).contains(&self.spike_negative_threshold) {
            return Err(ConfigError::invalid(
                "alerts.spike_negative_threshold",
                "must be between -1.0 and 1.0",
            ));
        }
        if !self.drop_threshold.is_finite() || self.drop_threshold < 0.0 {
            return Err(ConfigError::invalid("alerts.drop_threshold", "must be a non-negative number"));
        }
        if self.segment_min_sample == 0 {
            return Err(ConfigError::invalid("alerts.segment_min_sample", "must be greater than 0"));
        }
        if !(0.0..=100.0).contains(&self.segment_pct_threshold) {
            return Err(ConfigError::invalid(
                "alerts.segment_pct_threshold",
                "must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

impl SentimentThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.positive) || !(-1.0..=1.0).contains(&self.negative) {
            return Err(ConfigError::invalid("sentiment", "thresholds must be between -1.0 and 1.0"));
        }
        if self.negative >= self.positive {
            return Err(ConfigError::invalid("sentiment.negative", "must be below sentiment.positive"));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `TRIAGE_*` environment overrides. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })?;
                toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.alerts.validate()?;
        self.sentiment.validate()
    }

    /// Apply `TRIAGE_*` overrides using `lookup` to read variables.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let alerts = &mut self.alerts;
        override_from(&lookup, "TRIAGE_SPIKE_WINDOW", &mut alerts.spike_window);
        override_from(&lookup, "TRIAGE_SPIKE_NEGATIVE_THRESHOLD", &mut alerts.spike_negative_threshold);
        override_from(&lookup, "TRIAGE_SPIKE_MIN_RATIO", &mut alerts.spike_min_ratio);
        override_from(&lookup, "TRIAGE_DROP_WINDOW", &mut alerts.drop_window);
        override_from(&lookup, "TRIAGE_DROP_THRESHOLD", &mut alerts.drop_threshold);
        override_from(&lookup, "TRIAGE_SEGMENT_MIN_SAMPLE", &mut alerts.segment_min_sample);
        override_from(&lookup, "TRIAGE_SEGMENT_PCT_THRESHOLD", &mut alerts.segment_pct_threshold);
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable config override"),
        }
    }
}
