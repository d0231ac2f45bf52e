//! Urgency scoring: capped body/subject keyword sums and tier classification.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ScoringConfig, TierThresholds};
use crate::errors::TriageResult;
use crate::keywords::WeightTable;
use crate::models::{ClassifiedRecord, Record, ScoreBreakdown, Tier};

const SUBJECT_MARKER: &str = " (subject)";

/// Score and matched keywords for one subject/body pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    pub score: u32,
    /// Body matches, then subject matches tagged `(subject)`.
    pub keywords: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// Scores messages against a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct UrgencyEngine {
    table: WeightTable,
    body_cap: u32,
    subject_cap: u32,
    max_score: u32,
    tiers: TierThresholds,
}

impl UrgencyEngine {
    /// Build an engine. Invalid tiers, caps or weight tables fail here,
    /// never at scoring time.
    pub fn new(config: &ScoringConfig) -> TriageResult<Self> {
        config.validate()?;
        let table = WeightTable::from_entries(config.entries())?;
        tracing::debug!(
            phrases = table.entries().len(),
            body_cap = config.body_cap,
            subject_cap = config.subject_cap,
            "urgency engine ready"
        );
        Ok(Self {
            table,
            body_cap: config.body_cap,
            subject_cap: config.subject_cap,
            max_score: config.max_score,
            tiers: config.tiers,
        })
    }

    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    pub fn calculate(&self, subject: &str, body: &str) -> UrgencyAssessment {
        let body_match = self.table.score(body);
        let subject_match = self.table.score(subject);

        let capped_body = body_match.score.min(self.body_cap);
        let capped_subject = subject_match.score.min(self.subject_cap);
        let score = capped_body.saturating_add(capped_subject).min(self.max_score);

        let mut keywords = body_match.matched.clone();
        keywords.extend(
            subject_match
                .matched
                .iter()
                .map(|kw| format!("{kw}{SUBJECT_MARKER}")),
        );

        UrgencyAssessment {
            score,
            keywords,
            breakdown: ScoreBreakdown {
                body_score: body_match.score,
                subject_score: subject_match.score,
                capped_body,
                capped_subject,
                body_matches: body_match.matched,
                subject_matches: subject_match.matched,
            },
        }
    }

    pub fn classify(&self, score: u32) -> Tier {
        if score >= self.tiers.critical {
            Tier::Critical
        } else if score >= self.tiers.high {
            Tier::High
        } else if score >= self.tiers.medium {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    /// Score and classify one record. The rank stays unset.
    pub fn classify_record(&self, record: &Record) -> ClassifiedRecord {
        let assessment = self.calculate(record.subject.as_deref().unwrap_or(""), &record.body);
        ClassifiedRecord {
            id: record.id.clone(),
            sender: record.sender.clone(),
            subject: record.subject.clone(),
            body: record.body.clone(),
            urgency_score: assessment.score,
            tier: self.classify(assessment.score),
            keyword_list: assessment.keywords,
            priority_rank: None,
            timestamp: record.timestamp,
            breakdown: assessment.breakdown,
        }
    }

    /// Classify a batch across the rayon pool. Output order matches input.
    pub fn classify_batch(&self, records: &[Record]) -> Vec<ClassifiedRecord> {
        let classified: Vec<ClassifiedRecord> =
            records.par_iter().map(|r| self.classify_record(r)).collect();
        tracing::debug!(count = classified.len(), "classified batch");
        classified
    }
}

/// Number of records per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total += 1;
            match r.tier {
                Tier::Critical => acc.critical += 1,
                Tier::High => acc.high += 1,
                Tier::Medium => acc.medium += 1,
                Tier::Low => acc.low += 1,
            }
            acc
        })
    }

    pub fn high_priority(&self) -> usize {
        self.critical + self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;
    use crate::errors::TriageError;

    fn engine() -> UrgencyEngine {
        UrgencyEngine::new(&ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_reference_example() {
        let a = engine().calculate("URGENT: respond ASAP", "Please confirm by end of day");
        assert_eq!(a.breakdown.body_matches, vec!["please", "end of day", "confirm"]);
        assert_eq!(a.breakdown.body_score, 28);
        assert_eq!(a.breakdown.subject_matches, vec!["asap", "urgent", "respond asap"]);
        assert_eq!(a.breakdown.subject_score, 38);
        assert_eq!(a.breakdown.capped_subject, 30);
        assert_eq!(a.score, 58);
        assert_eq!(
            a.keywords,
            vec![
                "please",
                "end of day",
                "confirm",
                "asap (subject)",
                "urgent (subject)",
                "respond asap (subject)",
            ]
        );
        assert_eq!(engine().classify(a.score), Tier::High);
    }

    #[test]
    fn test_body_cap() {
        let body = "URGENT emergency, critical issue. Need response immediately, asap! \
                    Deadline expires today by noon, please call me.";
        let a = engine().calculate("", body);
        assert!(a.breakdown.body_score > 70);
        assert_eq!(a.breakdown.capped_body, 70);
        assert_eq!(a.score, 70);
        assert_eq!(engine().classify(a.score), Tier::High);
    }

    #[test]
    fn test_both_caps_reach_max() {
        let text = "urgent asap emergency critical immediately deadline today please confirm";
        let a = engine().calculate(text, text);
        assert_eq!(a.score, 100);
        assert_eq!(engine().classify(a.score), Tier::Critical);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        let a = engine().calculate("", "");
        assert_eq!(a.score, 0);
        assert!(a.keywords.is_empty());
        assert_eq!(engine().classify(0), Tier::Low);
    }

    #[test]
    fn test_classify_boundaries() {
        let e = engine();
        assert_eq!(e.classify(0), Tier::Low);
        assert_eq!(e.classify(25), Tier::Low);
        assert_eq!(e.classify(26), Tier::Medium);
        assert_eq!(e.classify(50), Tier::Medium);
        assert_eq!(e.classify(51), Tier::High);
        assert_eq!(e.classify(75), Tier::High);
        assert_eq!(e.classify(76), Tier::Critical);
        assert_eq!(e.classify(100), Tier::Critical);
    }

    #[test]
    fn test_invalid_tiers_fail_construction() {
        let mut config = ScoringConfig::default();
        config.tiers.medium = 60;
        let err = UrgencyEngine::new(&config).unwrap_err();
        assert!(matches!(err, TriageError::Configuration(_)));
    }

    #[test]
    fn test_huge_weights_do_not_overflow() {
        let config = ScoringConfig {
            categories: vec![CategoryConfig {
                name: "critical".into(),
                phrases: [("alpha".to_string(), 3_000_000_000), ("beta".to_string(), 3_000_000_000)]
                    .into_iter()
                    .collect(),
            }],
            time_keywords: Default::default(),
            action_keywords: Default::default(),
            body_cap: u32::MAX,
            subject_cap: u32::MAX,
            max_score: u32::MAX,
            tiers: TierThresholds::default(),
        };
        let e = UrgencyEngine::new(&config).unwrap();
        let a = e.calculate("alpha beta", "alpha beta");
        assert_eq!(a.breakdown.body_score, u32::MAX);
        assert_eq!(a.breakdown.subject_score, u32::MAX);
        assert_eq!(a.score, u32::MAX);
        assert_eq!(e.classify(a.score), Tier::Critical);
    }

    #[test]
    fn test_missing_subject_record() {
        let record = Record {
            id: "1".into(),
            sender: "ops@example.com".into(),
            subject: None,
            body: "Server down, need help now".into(),
            timestamp: None,
        };
        let c = engine().classify_record(&record);
        assert_eq!(c.urgency_score, 23);
        assert_eq!(c.keyword_list, vec!["now", "need"]);
        assert_eq!(c.tier, Tier::Low);
        assert_eq!(c.priority_rank, None);
    }

    #[test]
    fn test_batch_preserves_order_and_counts() {
        let records: Vec<Record> = ["urgent asap now", "hello there", "please reply soon"]
            .iter()
            .enumerate()
            .map(|(i, body)| Record {
                id: i.to_string(),
                sender: String::new(),
                subject: None,
                body: body.to_string(),
                timestamp: None,
            })
            .collect();
        let out = engine().classify_batch(&records);
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(out[0].urgency_score, 45);
        assert_eq!(out[1].urgency_score, 0);
        assert_eq!(out[2].urgency_score, 20);

        let counts = TierCounts::from_records(&out);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.low, 2);
        assert_eq!(counts.high_priority(), 0);
    }
}
