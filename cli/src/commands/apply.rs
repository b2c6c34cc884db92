use clap::Args;
use jailtab_middleware::Middleware;
use jailtab_reconcile::{MatchPolicy, OnError, ReconcileRequest, Reconciler};
use std::path::PathBuf;
use std::sync::Arc;

use super::OutputFormat;
use crate::config::JailConfig;
use crate::utils::print_report;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON file describing the jail's fstab
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Name of the jail (overrides the config file)
    #[arg(long, short)]
    pub jail: Option<String>,

    /// Keep fstab entries that are not listed (overrides the config file)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub append: Option<bool>,

    /// Only report what would change
    #[arg(long)]
    pub check: bool,

    /// Fail when a mount point matches more than one existing entry
    #[arg(long)]
    pub strict: bool,

    /// Stop at the first rejected operation
    #[arg(long)]
    pub abort_on_error: bool,
}

impl ApplyArgs {
    fn into_request(self, dry_run: bool) -> Result<ReconcileRequest, Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => JailConfig::load(path)?,
            None => JailConfig::default(),
        };
        let (jail, config) = config.merge(self.jail, self.append)?;

        let mut request = ReconcileRequest::new(&jail, config.fstab);
        request.append = config.append;
        request.check_mode = dry_run || self.check;
        if self.strict {
            request.match_policy = MatchPolicy::Strict;
        }
        if self.abort_on_error {
            request.on_error = OnError::Abort;
        }
        Ok(request)
    }
}

pub async fn handle_apply(
    middleware: Arc<dyn Middleware>,
    args: ApplyArgs,
    dry_run: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = args.into_request(dry_run)?;

    tracing::info!(
        "Reconciling {} mount points for jail {} (append: {}, check: {})",
        request.fstab.len(),
        request.jail,
        request.append,
        request.check_mode
    );

    let reconciler = Reconciler::new(middleware);
    let report = reconciler
        .reconcile(&request)
        .await
        .map_err(|e| format!("Error reconciling jail {}: {}", request.jail, e))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if report.failed() {
        return Err(format!(
            "{} of {} operations failed",
            report.failures.len(),
            report.plan.operations.len()
        )
        .into());
    }

    Ok(())
}
