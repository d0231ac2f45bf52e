//! Priority ranking over a classified batch.

use crate::errors::{TriageError, TriageResult};
use crate::models::ClassifiedRecord;

/// Order by urgency score (highest first), then timestamp (earliest first),
/// then ingestion order, and assign dense ranks `1..=N`.
///
/// Every record needs a timestamp; without one the tie-break is undefined
/// and the whole batch is rejected.
pub fn rank(records: Vec<ClassifiedRecord>) -> TriageResult<Vec<ClassifiedRecord>> {
    if let Some(missing) = records.iter().find(|r| r.timestamp.is_none()) {
        return Err(TriageError::MissingField {
            record_id: missing.id.clone(),
            field: "timestamp",
        });
    }

    let mut ranked = records;
    // `sort_by` is stable, which keeps ingestion order for full ties.
    ranked.sort_by(|a, b| {
        b.urgency_score
            .cmp(&a.urgency_score)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
    for (i, record) in ranked.iter_mut().enumerate() {
        record.priority_rank = Some(i as u32 + 1);
    }
    tracing::debug!(count = ranked.len(), "ranked batch");
    Ok(ranked)
}

/// The `n` highest-ranked records.
pub fn top_n(ranked: &[ClassifiedRecord], n: usize) -> &[ClassifiedRecord] {
    &ranked[..n.min(ranked.len())]
}
