//! Weighted phrase tables and presence-based keyword scoring.

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};

use crate::config::{ACTION_CATEGORY, TIME_CATEGORY};
use crate::errors::{ConfigError, TriageError, TriageResult};
use crate::preprocess::normalize;

/// One `(category, phrase, weight)` row of a weight table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightEntry {
    pub category: String,
    pub phrase: String,
    pub weight: u32,
}

/// Result of scoring one text against a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordMatch {
    pub score: u32,
    /// Matched phrases in scan order, each literal at most once.
    pub matched: Vec<String>,
}

/// Validated, canonically ordered weight table with a compiled matcher.
///
/// Categories scan in a fixed order (see [`category_rank`]); phrases within
/// a category are sorted, so scoring output does not depend on how the
/// caller stored the table.
#[derive(Debug, Clone)]
pub struct WeightTable {
    entries: Vec<WeightEntry>,
    /// Matcher pattern id for each entry.
    pattern_ids: Vec<usize>,
    pattern_count: usize,
    matcher: AhoCorasick,
}

/// Scan position of a category: critical, high, medium, any other category
/// (ordered by name), then time and action keywords.
pub(crate) fn category_rank(category: &str) -> u8 {
    match category {
        "critical" => 0,
        "high" => 1,
        "medium" => 2,
        TIME_CATEGORY => 4,
        ACTION_CATEGORY => 5,
        _ => 3,
    }
}

/// Normalize and validate entries, returning them in canonical order.
///
/// Phrases are normalized like scored text. An identical phrase repeated in
/// one category with the same weight collapses to a single entry; with a
/// different weight it is rejected. The same phrase in different categories
/// is kept in each.
pub(crate) fn canonical_entries(entries: Vec<WeightEntry>) -> Result<Vec<WeightEntry>, ConfigError> {
    let mut normalized = Vec::with_capacity(entries.len());
    for entry in entries {
        let phrase = normalize(&entry.phrase);
        if phrase.is_empty() {
            return Err(ConfigError::invalid(
                format!("scoring.{}", entry.category),
                "phrases must not be blank",
            ));
        }
        if entry.weight == 0 {
            return Err(ConfigError::invalid(
                format!("scoring.{}.{}", entry.category, phrase),
                "weight must be a positive integer",
            ));
        }
        normalized.push(WeightEntry {
            category: entry.category,
            phrase,
            weight: entry.weight,
        });
    }

    normalized.sort_by(|a, b| {
        category_rank(&a.category)
            .cmp(&category_rank(&b.category))
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.phrase.cmp(&b.phrase))
            .then(a.weight.cmp(&b.weight))
    });

    let mut canonical: Vec<WeightEntry> = Vec::with_capacity(normalized.len());
    for entry in normalized {
        if let Some(prev) = canonical
            .last()
            .filter(|p| p.category == entry.category && p.phrase == entry.phrase)
        {
            if prev.weight != entry.weight {
                return Err(ConfigError::invalid(
                    format!("scoring.{}.{}", entry.category, entry.phrase),
                    format!("conflicting weights {} and {}", prev.weight, entry.weight),
                ));
            }
            continue;
        }
        canonical.push(entry);
    }
    Ok(canonical)
}

impl WeightTable {
    pub fn from_entries(entries: Vec<WeightEntry>) -> TriageResult<Self> {
        let entries = canonical_entries(entries)?;

        let mut patterns: Vec<&str> = Vec::new();
        let mut pattern_ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            let id = match patterns.iter().position(|p| *p == entry.phrase) {
                Some(id) => id,
                None => {
                    patterns.push(&entry.phrase);
                    patterns.len() - 1
                }
            };
            pattern_ids.push(id);
        }
        let pattern_count = patterns.len();
        let matcher = AhoCorasick::new(&patterns).map_err(|e| TriageError::Matcher(e.to_string()))?;

        Ok(Self {
            entries,
            pattern_ids,
            pattern_count,
            matcher,
        })
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Presence-based weighted match of `text` against this table.
    ///
    /// Each entry contributes its weight once if its phrase occurs anywhere
    /// in the normalized text, however many times it occurs. A phrase listed
    /// in several categories contributes each category's weight but appears
    /// once in `matched`. The sum saturates at `u32::MAX`.
    pub fn score(&self, text: &str) -> KeywordMatch {
        let normalized = normalize(text);
        if normalized.is_empty() || self.entries.is_empty() {
            return KeywordMatch::default();
        }

        let mut present = vec![false; self.pattern_count];
        for m in self.matcher.find_overlapping_iter(&normalized) {
            present[m.pattern().as_usize()] = true;
        }

        let mut result = KeywordMatch::default();
        for (entry, &id) in self.entries.iter().zip(&self.pattern_ids) {
            if !present[id] {
                continue;
            }
            result.score = result.score.saturating_add(entry.weight);
            if !result.matched.contains(&entry.phrase) {
                result.matched.push(entry.phrase.clone());
            }
        }
        result
    }
}
