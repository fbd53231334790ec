//! Backup statistics command

use super::helpers::CliContext;
use formkeep_core::error::Result;

/// Handle stats command
pub fn handle(ctx: &CliContext, json: bool) -> Result<()> {
    let stats = ctx.dashboard()?.get_backup_stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Form backups");
    println!("  Total:       {}", stats.total);
    println!("  Active:      {}", stats.active);
    println!("  Submitted:   {}", stats.submitted);
    println!("  Abandoned:   {}", stats.abandoned);
    println!("  Failed:      {}", stats.failed);
    println!("  Recoverable: {}", stats.recoverable);

    Ok(())
}
