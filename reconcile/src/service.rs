use crate::error::ReconcileError;
use crate::plan::{ChangeOperation, ReconciliationPlan, plan};
use crate::types::*;
use jailtab_middleware::{Middleware, MiddlewareError, RootCache, jail};
use jailtab_mount::{JailPaths, MountSpec, ObservedEntry, is_absolute};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

/// A computed plan together with the state it was computed from.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub plan: ReconciliationPlan,
    pub paths: JailPaths,
    pub observed: Vec<ObservedEntry>,
}

pub struct Reconciler<M: Middleware + ?Sized> {
    middleware: Arc<M>,
    roots: RootCache,
}

impl<M: Middleware + ?Sized> Reconciler<M> {
    pub fn new(middleware: Arc<M>) -> Self {
        Self::with_root_cache(middleware, RootCache::new())
    }

    /// Share a root cache between reconcilers, e.g. one per jail.
    pub fn with_root_cache(middleware: Arc<M>, roots: RootCache) -> Self {
        Self { middleware, roots }
    }

    pub fn root_cache(&self) -> &RootCache {
        &self.roots
    }

    pub async fn observe(&self, jail_name: &str) -> Result<Vec<ObservedEntry>, ReconcileError> {
        let entries = jail::list_fstab(self.middleware.as_ref(), jail_name).await?;
        tracing::debug!("Jail {} has {} fstab entries", jail_name, entries.len());
        Ok(entries)
    }

    /// Resolution context for `jail_name`. The root is only looked up when
    /// some desired target is relative.
    pub async fn jail_paths(
        &self,
        jail_name: &str,
        desired: &[MountSpec],
    ) -> Result<JailPaths, ReconcileError> {
        if desired.iter().all(|spec| is_absolute(&spec.target)) {
            return Ok(JailPaths::new(jail_name, None));
        }

        let middleware = self.middleware.as_ref();
        let root = self
            .roots
            .get_or_try_init(jail_name, || async move { jail::get_iocroot(middleware).await })
            .await
            .map_err(|source| ReconcileError::RootUnavailable {
                jail: jail_name.to_string(),
                source,
            })?;

        Ok(JailPaths::new(jail_name, Some(root)))
    }

    pub async fn prepare(&self, request: &ReconcileRequest) -> Result<Prepared, ReconcileError> {
        for spec in &request.fstab {
            spec.validate()?;
        }

        let paths = self.jail_paths(&request.jail, &request.fstab).await?;
        let observed = self.observe(&request.jail).await?;

        let plan = plan(
            &request.fstab,
            &observed,
            request.append,
            &paths,
            request.match_policy,
        )?;

        let summary = plan.summary();
        tracing::info!(
            "Planned {} add, {} replace, {} remove, {} unchanged for jail {}",
            summary.add,
            summary.replace,
            summary.remove,
            summary.unchanged,
            request.jail
        );

        Ok(Prepared {
            plan,
            paths,
            observed,
        })
    }

    /// Submit a plan's operations in order.
    pub async fn apply(
        &self,
        jail_name: &str,
        plan: &ReconciliationPlan,
        on_error: OnError,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut operations = plan.operations.iter().enumerate();

        for (index, op) in operations.by_ref() {
            match self.submit(jail_name, op).await {
                Ok(_) => {
                    tracing::info!("Jail {}: {}", jail_name, op);
                    report.applied.push(op.clone());
                }
                Err(e) => {
                    tracing::error!("Jail {}: {} failed: {}", jail_name, op, e);
                    report.failures.push(OperationFailure::new(index, op.clone(), &e));
                    if on_error == OnError::Abort {
                        break;
                    }
                }
            }
        }

        report.skipped = operations.map(|(_, op)| op.clone()).collect();
        if !report.skipped.is_empty() {
            tracing::warn!(
                "Jail {}: skipped {} remaining operations",
                jail_name,
                report.skipped.len()
            );
        }

        report
    }

    async fn submit(&self, jail_name: &str, op: &ChangeOperation) -> Result<Value, MiddlewareError> {
        let middleware = self.middleware.as_ref();
        match op {
            ChangeOperation::Add { entry, .. } => jail::add_entry(middleware, jail_name, entry).await,
            ChangeOperation::Replace { id, entry, .. } => {
                jail::replace_entry(middleware, jail_name, id, entry).await
            }
            ChangeOperation::Remove { id, .. } => jail::remove_entry(middleware, jail_name, id).await,
        }
    }

    /// Plan, and unless in check mode apply, the request.
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileReport, ReconcileError> {
        let Prepared {
            plan,
            paths,
            observed,
        } = self.prepare(request).await?;

        let iocroot = paths.root().map(str::to_string);
        let user_entries = |entries: Vec<ObservedEntry>| -> Vec<ObservedEntry> {
            entries.into_iter().filter(|e| e.is_user()).collect()
        };

        if request.check_mode || !plan.has_changes() {
            let msg = describe(request, &plan, None);
            return Ok(ReconcileReport {
                jail: request.jail.clone(),
                changed: plan.has_changes(),
                check_mode: request.check_mode,
                iocroot,
                summary: plan.summary(),
                plan,
                failures: vec![],
                skipped: vec![],
                fstab: user_entries(observed),
                msg,
            });
        }

        let applied = self.apply(&request.jail, &plan, request.on_error).await;
        let mut msg = describe(request, &plan, Some(&applied));

        let fstab = match self.observe(&request.jail).await {
            Ok(entries) => user_entries(entries),
            Err(e) => {
                tracing::warn!("Could not re-read fstab of jail {}: {}", request.jail, e);
                let _ = writeln!(msg, "Could not re-read fstab: {}", e);
                vec![]
            }
        };

        Ok(ReconcileReport {
            jail: request.jail.clone(),
            changed: !applied.applied.is_empty(),
            check_mode: false,
            iocroot,
            summary: plan.summary(),
            plan,
            failures: applied.failures,
            skipped: applied.skipped,
            fstab,
            msg,
        })
    }
}

fn describe(
    request: &ReconcileRequest,
    plan: &ReconciliationPlan,
    applied: Option<&ApplyReport>,
) -> String {
    let mut msg = String::new();
    let verb = if request.check_mode { "Would " } else { "" };

    for spec in &plan.unchanged {
        let _ = writeln!(msg, "Up to date: {}", spec.target);
    }

    // Skipped operations are always the tail of the plan.
    let first_skipped = applied
        .map(|r| plan.operations.len().saturating_sub(r.skipped.len()))
        .unwrap_or(plan.operations.len());

    for (i, op) in plan.operations.iter().enumerate() {
        let failed = applied
            .map(|r| r.failures.iter().any(|f| f.index == i))
            .unwrap_or(false);
        let skipped = i >= first_skipped;

        let status = if failed {
            " (failed)"
        } else if skipped {
            " (skipped)"
        } else {
            ""
        };
        let _ = writeln!(msg, "{}{}{}", verb, op, status);
    }

    if request.append {
        let _ = writeln!(msg, "Other fstab entries are left in place.");
    }
    if !plan.has_changes() {
        let _ = writeln!(msg, "Nothing to do.");
    }

    msg
}
