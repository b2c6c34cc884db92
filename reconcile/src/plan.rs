use crate::error::ReconcileError;
use jailtab_mount::{FstabEntry, JailPaths, MountSpec, ObservedEntry};
use serde::Serialize;
use std::collections::HashSet;

/// How to treat a desired mount point that matches several existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Use the first entry in middleware order; later duplicates are left
    /// unmatched.
    #[default]
    FirstMatch,
    /// Refuse to plan.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Add {
        spec: MountSpec,
        entry: FstabEntry,
    },
    Replace {
        id: String,
        spec: MountSpec,
        entry: FstabEntry,
        current: FstabEntry,
    },
    Remove {
        id: String,
        entry: FstabEntry,
    },
}

impl ChangeOperation {
    /// Middleware id of the entry this operation touches, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            ChangeOperation::Add { .. } => None,
            ChangeOperation::Replace { id, .. } | ChangeOperation::Remove { id, .. } => Some(id),
        }
    }

    pub fn entry(&self) -> &FstabEntry {
        match self {
            ChangeOperation::Add { entry, .. }
            | ChangeOperation::Replace { entry, .. }
            | ChangeOperation::Remove { entry, .. } => entry,
        }
    }
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOperation::Add { entry, .. } => write!(f, "add {}", entry),
            ChangeOperation::Replace {
                id, entry, current, ..
            } => write!(f, "replace #{} {} (was {})", id, entry, current),
            ChangeOperation::Remove { id, entry } => write!(f, "remove #{} {}", id, entry),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub add: usize,
    pub replace: usize,
    pub remove: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub operations: Vec<ChangeOperation>,
    /// Desired entries already present and correct.
    pub unchanged: Vec<MountSpec>,
}

impl ReconciliationPlan {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            unchanged: self.unchanged.len(),
            ..Default::default()
        };
        for op in &self.operations {
            match op {
                ChangeOperation::Add { .. } => summary.add += 1,
                ChangeOperation::Replace { .. } => summary.replace += 1,
                ChangeOperation::Remove { .. } => summary.remove += 1,
            }
        }
        summary
    }
}

/// Compute the operations that bring a jail's user fstab entries in line
/// with `desired`.
///
/// Only `USER` entries take part; `SYSTEM` entries are never matched,
/// replaced or removed. A desired spec and an existing entry describe the
/// same mount point when the spec's resolved target equals the entry's
/// stored target. Entries no spec claims are removed unless `append` is set.
///
/// Operations come out in input order: adds and replaces follow `desired`,
/// removals follow `observed`. Nothing is planned until every spec has
/// resolved, so a failure yields no partial plan. Two specs resolving to the
/// same mount point are rejected.
pub fn plan(
    desired: &[MountSpec],
    observed: &[ObservedEntry],
    append: bool,
    paths: &JailPaths,
    policy: MatchPolicy,
) -> Result<ReconciliationPlan, ReconcileError> {
    let user: Vec<&ObservedEntry> = observed.iter().filter(|e| e.is_user()).collect();
    let mut matched = vec![false; user.len()];
    let mut result = ReconciliationPlan::default();

    let mut resolved: Vec<(&MountSpec, String)> = Vec::with_capacity(desired.len());
    let mut seen = HashSet::new();
    for spec in desired {
        spec.validate()?;
        let target = paths.resolve(&spec.target)?;
        if !seen.insert(target.clone()) {
            return Err(ReconcileError::DuplicateTarget { target });
        }
        resolved.push((spec, target));
    }

    for (spec, target) in resolved {
        let candidates: Vec<usize> = user
            .iter()
            .enumerate()
            .filter(|(_, e)| e.entry.target == target)
            .map(|(i, _)| i)
            .collect();

        if candidates.len() > 1 {
            let ids: Vec<String> = candidates.iter().map(|&i| user[i].id.clone()).collect();
            if policy == MatchPolicy::Strict {
                return Err(ReconcileError::AmbiguousMatch { target, ids });
            }
            tracing::warn!(
                "Mount point {} matches entries {:?}; using the first",
                target,
                ids
            );
        }

        let wanted = spec.to_entry(&target);

        match candidates.first() {
            None => {
                tracing::debug!("No entry for {}; adding", target);
                result.operations.push(ChangeOperation::Add {
                    spec: spec.clone(),
                    entry: wanted,
                });
            }
            Some(&i) => {
                matched[i] = true;
                let existing = user[i];

                if existing.entry == wanted {
                    tracing::debug!("Entry #{} for {} is up to date", existing.id, target);
                    result.unchanged.push(spec.clone());
                } else {
                    tracing::debug!("Entry #{} for {} differs; replacing", existing.id, target);
                    result.operations.push(ChangeOperation::Replace {
                        id: existing.id.clone(),
                        spec: spec.clone(),
                        entry: wanted,
                        current: existing.entry.clone(),
                    });
                }
            }
        }
    }

    if !append {
        for (entry, _) in user.iter().zip(&matched).filter(|(_, m)| !**m) {
            tracing::debug!("Entry #{} at {} is unmanaged; removing", entry.id, entry.entry.target);
            result.operations.push(ChangeOperation::Remove {
                id: entry.id.clone(),
                entry: entry.entry.clone(),
            });
        }
    }

    Ok(result)
}
