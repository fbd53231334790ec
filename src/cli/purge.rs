//! Retention purge command

use super::helpers::CliContext;
use chrono::Utc;
use formkeep_core::{error::Result, KeyValueStore};
use tracing::info;

/// Handle purge command
///
/// Removes entries outside the retention window, or every entry with `all`.
pub fn handle(ctx: &CliContext, all: bool) -> Result<()> {
    if all {
        ctx.storage()?.remove(&ctx.config.storage_key)?;
        info!("Removed all stored backups");
        println!("Removed all stored backups.");
        return Ok(());
    }

    let purged = ctx.dashboard()?.purge_expired(Utc::now())?;
    println!(
        "Purged {} backup(s) older than {} day(s).",
        purged, ctx.config.retention_days
    );
    Ok(())
}
