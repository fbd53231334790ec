//! Dashboard API server command

use super::helpers::CliContext;
use formkeep_core::{
    api::{ApiServer, ApiServerConfig},
    error::Result,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Handle API server startup command
pub async fn handle(ctx: &CliContext, addr: String) -> Result<()> {
    debug!("Starting HTTP API server...");

    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", addr, e))?;
    let config = ApiServerConfig { addr: socket_addr };

    println!();
    println!("FormKeep Dashboard API");
    println!();
    println!("   Address: http://{}", socket_addr);
    println!("   Data:    {}", ctx.data_dir.display());
    println!();
    println!("   Endpoints:");
    println!("   - GET  /backups - List backups (status, search, form_id)");
    println!("   - POST /backups - Receive a backup from a tracker");
    println!("   - GET  /backups/stats - Backup statistics");
    println!("   - GET  /backups/abandoned - Abandoned forms (hours)");
    println!("   - GET  /backups/failed - Failed submissions (hours)");
    println!("   - GET  /backups/export - Export (format, form_id)");
    println!("   - GET  /health - Health check");
    println!();

    let server = ApiServer::new(config, Arc::new(ctx.dashboard()?));
    server.serve().await?;

    Ok(())
}
