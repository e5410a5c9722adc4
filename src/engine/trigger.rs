//! Trigger evaluation for one poll cycle.

use crate::domain::{Policy, UnderlyingAsset};

/// Result of evaluating a policy snapshot against one observed price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerEvaluation {
    pub evaluated: usize,
    pub triggered: Vec<Policy>,
}

/// Select the active policies on `asset` whose barrier `price` has crossed.
///
/// Every policy in the snapshot is judged against the same price.
pub fn evaluate(snapshot: Vec<Policy>, asset: UnderlyingAsset, price: f64) -> TriggerEvaluation {
    let mut evaluation = TriggerEvaluation::default();

    for policy in snapshot {
        if !policy.is_active() || policy.asset != asset {
            continue;
        }
        evaluation.evaluated += 1;
        if policy.is_triggered_by(price) {
            evaluation.triggered.push(policy);
        }
    }

    evaluation
}
