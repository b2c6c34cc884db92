use crate::plan::{ChangeOperation, MatchPolicy, PlanSummary, ReconciliationPlan};
use jailtab_middleware::{JobFailure, MiddlewareError};
use jailtab_mount::{MountSpec, ObservedEntry};
use serde::Serialize;

/// What to do when the middleware rejects an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    /// Keep submitting the remaining operations.
    #[default]
    Continue,
    /// Stop at the first failure; the rest are reported as skipped.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub jail: String,
    pub fstab: Vec<MountSpec>,
    pub append: bool,
    pub check_mode: bool,
    pub match_policy: MatchPolicy,
    pub on_error: OnError,
}

impl ReconcileRequest {
    pub fn new(jail: &str, fstab: Vec<MountSpec>) -> Self {
        Self {
            jail: jail.to_string(),
            fstab,
            append: false,
            check_mode: false,
            match_policy: MatchPolicy::default(),
            on_error: OnError::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationFailure {
    /// Position of the operation in the plan.
    pub index: usize,
    pub operation: ChangeOperation,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JobFailure>,
}

impl OperationFailure {
    pub fn new(index: usize, operation: ChangeOperation, error: &MiddlewareError) -> Self {
        Self {
            index,
            operation,
            message: error.to_string(),
            details: error.details().cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<ChangeOperation>,
    pub failures: Vec<OperationFailure>,
    pub skipped: Vec<ChangeOperation>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub jail: String,
    pub changed: bool,
    pub check_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iocroot: Option<String>,
    pub summary: PlanSummary,
    pub plan: ReconciliationPlan,
    pub failures: Vec<OperationFailure>,
    pub skipped: Vec<ChangeOperation>,
    /// The jail's user fstab entries after the run (before it, in check mode).
    pub fstab: Vec<ObservedEntry>,
    pub msg: String,
}

impl ReconcileReport {
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}
