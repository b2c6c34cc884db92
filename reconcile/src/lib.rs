mod error;
mod plan;
mod service;
mod types;

pub use error::ReconcileError;
pub use plan::{ChangeOperation, MatchPolicy, PlanSummary, ReconciliationPlan, plan};
pub use service::{Prepared, Reconciler};
pub use types::*;
