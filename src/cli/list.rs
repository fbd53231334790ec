//! Entry listing command

use super::helpers::{format_entry_line, CliContext};
use formkeep_core::{
    error::{FormKeepError, Result},
    BackupFilter, EntryStatus,
};

/// Which slice of entries to list
pub enum ListView {
    Filtered(BackupFilter),
    Abandoned { hours: i64 },
    Failed { hours: i64 },
}

/// Handle list command
pub fn handle(ctx: &CliContext, view: ListView, limit: usize, json: bool) -> Result<()> {
    let dashboard = ctx.dashboard()?;

    let mut entries = match view {
        ListView::Filtered(filter) => dashboard.filter(&filter),
        ListView::Abandoned { hours } => dashboard.get_abandoned_forms(hours),
        ListView::Failed { hours } => dashboard.get_failed_submissions(hours),
    };
    entries.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}", format_entry_line(entry));
    }
    println!();
    println!("{} backup(s)", entries.len());

    Ok(())
}

/// Parse an optional status argument
pub fn parse_status(status: Option<String>) -> Result<Option<EntryStatus>> {
    status
        .map(|s| s.parse::<EntryStatus>().map_err(FormKeepError::Other))
        .transpose()
}
