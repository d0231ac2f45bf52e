use chrono::NaiveDate;
use proptest::prelude::*;
use triage_core::{
    rank, ClassifiedRecord, ScoreBreakdown, ScoringConfig, Tier, UrgencyEngine, WeightEntry,
    WeightTable,
};

fn default_entries() -> Vec<WeightEntry> {
    ScoringConfig::default().entries()
}

fn vocabulary() -> impl Strategy<Value = String> {
    let words: Vec<&'static str> = vec![
        "urgent", "asap", "now", "please", "need", "deadline", "today", "end of day",
        "confirm", "call me", "hello", "report", "Follow-Up", "URGENT NEED", "  ", "\n",
    ];
    prop::collection::vec(prop::sample::select(words), 0..20).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn urgency_score_is_bounded(subject in ".{0,200}", body in ".{0,400}") {
        let engine = UrgencyEngine::new(&ScoringConfig::default()).unwrap();
        let a = engine.calculate(&subject, &body);
        prop_assert!(a.score <= 100);
        prop_assert!(a.breakdown.capped_body <= 70);
        prop_assert!(a.breakdown.capped_subject <= 30);
    }

    #[test]
    fn keyword_heavy_text_is_bounded(subject in vocabulary(), body in vocabulary()) {
        let engine = UrgencyEngine::new(&ScoringConfig::default()).unwrap();
        let a = engine.calculate(&subject, &body);
        prop_assert!(a.score <= 100);
        prop_assert_eq!(
            a.score,
            (a.breakdown.body_score.min(70) + a.breakdown.subject_score.min(30)).min(100)
        );
    }

    #[test]
    fn score_ignores_entry_order(
        shuffled in Just(default_entries()).prop_shuffle(),
        text in vocabulary(),
    ) {
        let canonical = WeightTable::from_entries(default_entries()).unwrap();
        let permuted = WeightTable::from_entries(shuffled).unwrap();
        prop_assert_eq!(canonical.score(&text), permuted.score(&text));
    }

    #[test]
    fn score_ignores_category_order(text in vocabulary(), reversed in any::<bool>()) {
        let mut config = ScoringConfig::default();
        if reversed {
            config.categories.reverse();
        }
        let baseline = UrgencyEngine::new(&ScoringConfig::default()).unwrap();
        let reordered = UrgencyEngine::new(&config).unwrap();
        prop_assert_eq!(baseline.calculate(&text, &text), reordered.calculate(&text, &text));
    }

    #[test]
    fn duplicate_entries_do_not_double(text in vocabulary(), idx in 0usize..40) {
        let entries = default_entries();
        let mut doubled = entries.clone();
        doubled.push(entries[idx % entries.len()].clone());
        let base = WeightTable::from_entries(entries).unwrap();
        let dup = WeightTable::from_entries(doubled).unwrap();
        prop_assert_eq!(base.score(&text), dup.score(&text));
    }

    #[test]
    fn matched_phrases_are_unique(text in vocabulary()) {
        let table = WeightTable::from_entries(default_entries()).unwrap();
        let m = table.score(&text);
        let mut sorted = m.matched.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), m.matched.len());
    }

    #[test]
    fn ranks_are_dense(items in prop::collection::vec((0u32..=100, 0i64..5), 0..40)) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let records: Vec<ClassifiedRecord> = items
            .iter()
            .enumerate()
            .map(|(i, (score, hours))| ClassifiedRecord {
                id: i.to_string(),
                sender: String::new(),
                subject: None,
                body: String::new(),
                urgency_score: *score,
                tier: Tier::Low,
                keyword_list: Vec::new(),
                priority_rank: None,
                timestamp: Some(base + chrono::Duration::hours(*hours)),
                breakdown: ScoreBreakdown::default(),
            })
            .collect();
        let n = records.len();
        let ranked = rank(records).unwrap();
        let ranks: Vec<u32> = ranked.iter().map(|r| r.priority_rank.unwrap()).collect();
        prop_assert_eq!(ranks, (1..=n as u32).collect::<Vec<_>>());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].urgency_score >= pair[1].urgency_score);
            if pair[0].urgency_score == pair[1].urgency_score {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }
        }
    }
}
