use std::cmp::Ordering;
use std::collections::HashSet;

use treasury_core::{
    AnalysisError, AnalysisResult, ComparisonEntity, RankedEntity, RankingResult, Subject,
};

/// Ranks a subject's holdings-per-share against a table of peers.
///
/// The subject is placed ahead of the table before a stable descending sort,
/// so on an exact metric tie the subject ranks above the peer it ties with.
/// Peers that tie with each other keep their table order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(
        &self,
        subject: &Subject,
        comparison_table: &[ComparisonEntity],
    ) -> AnalysisResult<RankingResult> {
        subject.validate()?;
        validate_table(&subject.name, comparison_table)?;

        let subject_metric = subject.per_unit_metric();

        // (name, metric, is_subject)
        let mut combined: Vec<(&str, f64, bool)> = Vec::with_capacity(comparison_table.len() + 1);
        combined.push((subject.name.as_str(), subject_metric, true));
        combined.extend(
            comparison_table
                .iter()
                .map(|e| (e.name.as_str(), e.per_unit_metric, false)),
        );

        // sort_by is stable
        combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let subject_position = combined
            .iter()
            .position(|(_, _, is_subject)| *is_subject)
            .ok_or_else(|| AnalysisError::InvalidInput("subject missing from standings".to_string()))?;

        let leader_name = combined[0].0.to_string();

        let standings: Vec<RankedEntity> = combined
            .iter()
            .enumerate()
            .map(|(i, (name, metric, is_subject))| RankedEntity {
                rank: i + 1,
                name: name.to_string(),
                per_unit_metric: *metric,
                is_subject: *is_subject,
            })
            .collect();

        tracing::debug!(
            "Ranked {} at {}/{} (metric {:.8}, leader {})",
            subject.name,
            subject_position + 1,
            standings.len(),
            subject_metric,
            leader_name
        );

        Ok(RankingResult {
            subject_rank: subject_position + 1,
            total_entities: comparison_table.len() + 1,
            subject_metric,
            leader_name,
            standings,
        })
    }
}

/// Convenience wrapper around [`RankingEngine::rank`].
pub fn rank(subject: &Subject, comparison_table: &[ComparisonEntity]) -> AnalysisResult<RankingResult> {
    RankingEngine::new().rank(subject, comparison_table)
}

/// Names must be unique across the subject and the table.
fn validate_table(subject_name: &str, comparison_table: &[ComparisonEntity]) -> AnalysisResult<()> {
    let mut seen = HashSet::with_capacity(comparison_table.len());
    for entity in comparison_table {
        entity.validate()?;
        if entity.name == subject_name {
            return Err(AnalysisError::InvalidInput(format!(
                "subject name '{}' clashes with a comparison entity",
                subject_name
            )));
        }
        if !seen.insert(entity.name.as_str()) {
            return Err(AnalysisError::InvalidInput(format!(
                "duplicate comparison entity '{}'",
                entity.name
            )));
        }
    }
    Ok(())
}
