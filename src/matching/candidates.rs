//! Candidate finding and scoring
//!
//! Pure functions with no side effects, shared verbatim by the automatic
//! matching engine and the reviewer-facing candidate listing. The hard
//! filter guarantees exact amount and tolerance-window candidacy; the
//! weighted criteria only order candidates and explain the ordering.

use crate::types::{Direction, MatchCandidate, MatchCriterion, Payable, StatementItem};

/// Weights, tolerance and acceptance threshold for matching
///
/// The exact weighting and threshold are calibration choices, so every knob
/// is a field rather than a constant.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Maximum day difference between transaction date and due/payment date
    pub tolerance_days: i64,
    /// Baseline contributed by the exact amount match (always satisfied)
    pub amount_weight: f64,
    /// Maximum date-proximity contribution, at a same-day match
    pub date_weight: f64,
    /// Bonus when the extracted reference equals the document number
    pub document_ref_weight: f64,
    /// Bonus when the document number appears as a description token
    pub document_in_description_weight: f64,
    /// Maximum description/counterparty token-overlap contribution
    pub description_weight: f64,
    /// Minimum top-candidate score for the engine to auto-commit
    pub acceptance_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance_days: 3,
            amount_weight: 40.0,
            date_weight: 30.0,
            document_ref_weight: 25.0,
            document_in_description_weight: 20.0,
            description_weight: 15.0,
            acceptance_threshold: 60.0,
        }
    }
}

/// Rank open payables as match candidates for one pending item, best first
///
/// Hard filter: the payable's outstanding amount must equal the item amount
/// exactly in minor units, the item must be a debit (payables are settled by
/// outflows, never by credit lines), and the day difference against the
/// payable's due date (payment date when set) must be within the tolerance.
/// Ties are broken by smallest day difference, then payable id, so the
/// ranking is deterministic.
pub fn find_candidates(
    item: &StatementItem,
    open_payables: &[Payable],
    config: &MatchingConfig,
) -> Vec<MatchCandidate> {
    if item.direction != Direction::Debit {
        return Vec::new();
    }

    let mut candidates: Vec<MatchCandidate> = open_payables
        .iter()
        .filter_map(|payable| score_payable(item, payable, config))
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.date_diff_days.cmp(&b.date_diff_days))
            .then(a.payable_id.cmp(&b.payable_id))
    });
    candidates
}

fn score_payable(
    item: &StatementItem,
    payable: &Payable,
    config: &MatchingConfig,
) -> Option<MatchCandidate> {
    let outstanding = payable.outstanding_minor()?;
    if outstanding != item.amount_minor {
        return None;
    }

    let date_diff_days = (item.date - payable.match_date()).num_days().abs();
    if date_diff_days > config.tolerance_days {
        return None;
    }

    let mut score = config.amount_weight;
    let mut criteria = vec![MatchCriterion::AmountExact];

    // Linear decay from full weight at a same-day match to zero at the
    // tolerance boundary
    let date_score = if config.tolerance_days == 0 {
        config.date_weight
    } else {
        config.date_weight * (config.tolerance_days - date_diff_days) as f64
            / config.tolerance_days as f64
    };
    if date_score > 0.0 {
        score += date_score;
        criteria.push(MatchCriterion::DateProximity);
    }

    let document = payable.document_number.trim();
    let reference_matches = item
        .document_ref
        .as_deref()
        .map(str::trim)
        .is_some_and(|r| !r.is_empty() && r.eq_ignore_ascii_case(document));
    if reference_matches {
        score += config.document_ref_weight;
        criteria.push(MatchCriterion::DocumentReference);
    } else if !document.is_empty()
        && tokenize(&item.description).contains(&document.to_lowercase())
    {
        score += config.document_in_description_weight;
        criteria.push(MatchCriterion::DocumentInDescription);
    }

    let overlap = token_overlap(&payable.counterparty, &item.description);
    if overlap > 0.0 {
        score += config.description_weight * overlap;
        criteria.push(MatchCriterion::DescriptionOverlap);
    }

    Some(MatchCandidate {
        payable_id: payable.id,
        score,
        criteria,
        date_diff_days,
        payable: payable.snapshot(),
    })
}

/// Share of counterparty tokens also present in the description, in [0, 1]
fn token_overlap(counterparty: &str, description: &str) -> f64 {
    let reference = tokenize(counterparty);
    if reference.is_empty() {
        return 0.0;
    }
    let target = tokenize(description);
    let shared = reference.iter().filter(|t| target.contains(*t)).count();
    shared as f64 / reference.len() as f64
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
