//! Deterministic risk score from the clause types a report flags.

use std::collections::BTreeSet;

use clearterms_core::{ClauseType, RedFlag, RiskLevel};

const MAX_SCORE: u32 = 100;

/// Sum of per-type points over the *distinct* clause types in `red_flags`,
/// capped at 100, with its banded level. Unknown types count as `other`
/// and carry no points.
pub fn score(red_flags: &[RedFlag]) -> (u32, RiskLevel) {
    let kinds: BTreeSet<ClauseType> = red_flags.iter().map(|f| f.clause_type).collect();
    let total = kinds
        .iter()
        .map(|k| k.points())
        .sum::<u32>()
        .min(MAX_SCORE);
    (total, RiskLevel::from_score(total))
}
