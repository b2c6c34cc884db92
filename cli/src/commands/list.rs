use jailtab_middleware::{Middleware, jail};

use super::OutputFormat;
use crate::utils::print_entries;

pub async fn handle_list(
    middleware: &dyn Middleware,
    jail_name: &str,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = jail::list_fstab(middleware, jail_name)
        .await
        .map_err(|e| format!("Error looking up jail {}: {}", jail_name, e))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => print_entries(&entries),
    }

    Ok(())
}
