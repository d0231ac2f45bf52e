use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Parse the timestamp layouts seen in exported mail and social data.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Free-form text: anything that is not a JSON string reads as empty.
fn deserialize_text<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

fn deserialize_opt_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Identifiers arrive as strings or numbers depending on the exporter.
fn deserialize_id<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn deserialize_opt_timestamp<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

fn deserialize_opt_score<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(opt.and_then(|v| v.as_f64()).filter(|f| f.is_finite()))
}

/// An ingested email. Immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default, alias = "email_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_text")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
}

/// Severity tier derived from an urgency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Low,
    Medium,
    High,
    Critical,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Critical, Tier::High, Tier::Medium, Tier::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Critical => "Critical",
            Tier::High => "High",
            Tier::Medium => "Medium",
            Tier::Low => "Low",
        }
    }

    /// Critical and High records need immediate attention.
    pub fn is_high_priority(&self) -> bool {
        matches!(self, Tier::Critical | Tier::High)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scope scores before and after capping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub body_score: u32,
    pub subject_score: u32,
    pub capped_body: u32,
    pub capped_subject: u32,
    pub body_matches: Vec<String>,
    pub subject_matches: Vec<String>,
}

/// A record with its urgency score, tier and (after ranking) priority rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedRecord {
    pub id: String,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
    pub urgency_score: u32,
    pub tier: Tier,
    pub keyword_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

/// Sentiment label derived from a compound polarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        })
    }
}

/// A social-media post as ingested, before polarity scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialPost {
    #[serde(default, alias = "post_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "username", deserialize_with = "deserialize_text")]
    pub author: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub text: String,
    #[serde(default, alias = "platform", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_text")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
}

/// A post carrying its polarity scores, the input to alerting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoredPost {
    #[serde(default, alias = "post_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "username", deserialize_with = "deserialize_text")]
    pub author: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub text: String,
    #[serde(default, alias = "platform", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_text")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, alias = "compound", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_score")]
    pub compound_score: Option<f64>,
    #[serde(default, alias = "pos", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_score")]
    pub positive_score: Option<f64>,
    #[serde(default, alias = "neg", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_score")]
    pub negative_score: Option<f64>,
    #[serde(default, alias = "neu", skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_score")]
    pub neutral_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentLabel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00+01:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_record_lenient_fields() {
        let r: Record = serde_json::from_str(
            r#"{"email_id": 7, "sender": "a@b.c", "subject": null, "body": 42, "timestamp": "2024-01-05 10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(r.id, "7");
        assert_eq!(r.subject, None);
        assert_eq!(r.body, "");
        assert!(r.timestamp.is_some());
    }

    #[test]
    fn test_record_missing_fields_default() {
        let r: Record = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(r.sender, "");
        assert_eq!(r.body, "");
        assert_eq!(r.timestamp, None);
    }

    #[test]
    fn test_scored_post_aliases() {
        let p: ScoredPost = serde_json::from_str(
            r#"{"post_id": "p1", "username": "u", "text": "bad", "platform": "Twitter", "compound": -0.7}"#,
        )
        .unwrap();
        assert_eq!(p.segment.as_deref(), Some("Twitter"));
        assert_eq!(p.compound_score, Some(-0.7));
        assert_eq!(p.sentiment, None);
        assert_eq!(p.positive_score, None);
    }

    #[test]
    fn test_scored_post_components() {
        let p: ScoredPost = serde_json::from_str(
            r#"{"id": "p2", "compound_score": 0.4, "pos": 0.5, "neu": 0.5, "negative_score": "n/a"}"#,
        )
        .unwrap();
        assert_eq!(p.positive_score, Some(0.5));
        assert_eq!(p.neutral_score, Some(0.5));
        assert_eq!(p.negative_score, None);
    }

    #[test]
    fn test_tier_priority() {
        assert!(Tier::Critical.is_high_priority());
        assert!(Tier::High.is_high_priority());
        assert!(!Tier::Medium.is_high_priority());
        assert_eq!(Tier::Low.to_string(), "Low");
    }
}
