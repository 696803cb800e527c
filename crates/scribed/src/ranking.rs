//! Gap ranking stage.
//!
//! Asks the model to order candidate gaps by instructional impact for the
//! student's grade and stage, assigning a severity to each. Ranking is a
//! reordering, never a rewrite: model output is matched back to the input
//! gaps so descriptions, references and validated evidence survive intact.

use scribe_common::llm::{generate_structured, TextGenerator};
use scribe_common::types::{Gap, Severity, SkillDomain, Stage};
use serde::Deserialize;
use tracing::warn;

use crate::prompts;

#[derive(Debug, Deserialize)]
struct RankedEntry {
    #[serde(default)]
    skill_domain: SkillDomain,
    #[serde(default)]
    severity: Severity,
}

/// Order gaps by instructional priority and assign severities.
///
/// On model or parse failure the input order is preserved and every gap gets
/// medium severity, so a flaky model never loses a detected gap.
pub async fn rank_gaps(
    generator: &dyn TextGenerator,
    gaps: Vec<Gap>,
    grade_level: &str,
    stage: Stage,
) -> Vec<Gap> {
    if gaps.is_empty() {
        return gaps;
    }

    let prompt = prompts::build_ranking_prompt(&gaps, grade_level, stage);

    let ranked: Vec<RankedEntry> =
        match generate_structured(generator, prompts::RANKING_SYSTEM, &prompt).await {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!("gap ranking failed, keeping input order: {e}");
                return default_order(gaps);
            }
        };

    if ranked.is_empty() {
        warn!("gap ranking returned no entries, keeping input order");
        return default_order(gaps);
    }

    apply_ranking(gaps, ranked)
}

fn default_order(mut gaps: Vec<Gap>) -> Vec<Gap> {
    for gap in &mut gaps {
        gap.severity = Severity::Medium;
    }
    gaps
}

/// Match ranked entries back to input gaps by skill domain, first unused
/// match wins. Gaps the model omitted are appended in their original order.
fn apply_ranking(gaps: Vec<Gap>, ranked: Vec<RankedEntry>) -> Vec<Gap> {
    let mut remaining: Vec<Option<Gap>> = gaps.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for entry in ranked {
        let slot = remaining
            .iter_mut()
            .find(|slot| matches!(slot, Some(g) if g.skill_domain == entry.skill_domain));
        if let Some(slot) = slot {
            if let Some(mut gap) = slot.take() {
                gap.severity = entry.severity;
                ordered.push(gap);
            }
        }
    }

    for slot in remaining {
        if let Some(mut gap) = slot {
            gap.severity = Severity::Medium;
            ordered.push(gap);
        }
    }

    ordered
}
