use jailtab_mount::ObservedEntry;
use jailtab_reconcile::ReconcileReport;

pub fn print_entries(entries: &[ObservedEntry]) {
    if entries.is_empty() {
        println!("No fstab entries");
        return;
    }

    println!(
        "{:<5} {:<7} {:<30} {:<50} {:<8} {:<10} {:<4} {:<4}",
        "ID", "ORIGIN", "SOURCE", "MOUNT", "FSTYPE", "OPTIONS", "DUMP", "PASS"
    );

    for e in entries {
        println!(
            "{:<5} {:<7} {:<30} {:<50} {:<8} {:<10} {:<4} {:<4}",
            e.id,
            e.origin,
            e.entry.source,
            e.entry.target,
            e.entry.fs_type,
            e.entry.options,
            e.entry.dump,
            e.entry.pass
        );
    }
}

pub fn print_report(report: &ReconcileReport) {
    let mode = if report.check_mode { " (check mode)" } else { "" };
    println!("Jail: {}{}", report.jail, mode);
    if let Some(root) = &report.iocroot {
        println!("  Root: {}", root);
    }
    println!(
        "  Changed: {}",
        if report.changed { "✓ yes" } else { "✗ no" }
    );
    println!(
        "  Plan: {} add, {} replace, {} remove, {} unchanged",
        report.summary.add, report.summary.replace, report.summary.remove, report.summary.unchanged
    );

    println!();
    print!("{}", report.msg);

    for failure in &report.failures {
        println!();
        println!("Failed: {}", failure.operation);
        println!("  Error: {}", failure.message);
        if let Some(details) = &failure.details {
            if let Some(progress) = details.progress.as_ref().and_then(|p| p.description.as_ref()) {
                println!("  Progress: {}", progress);
            }
            if let Some(exception) = &details.exception {
                println!("  Exception:\n{}", exception);
            }
        }
    }

    println!();
    print_entries(&report.fstab);
}
