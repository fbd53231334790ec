//! Event log replay command
//!
//! Reads tracker commands as JSON lines from a file or stdin and feeds them to
//! a tracker runtime backed by the data directory. End of input is page
//! teardown: active entries are marked abandoned and saved.

use super::helpers::CliContext;
use formkeep_core::{
    error::{FormKeepError, Result},
    sync::RemoteSync,
    FormTracker, TrackerCommand, TrackerService,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Handle track command
pub async fn handle(ctx: &CliContext, input: Option<PathBuf>, pace_ms: Option<u64>) -> Result<()> {
    let storage = ctx.storage()?;
    let mut tracker = FormTracker::new(storage, &ctx.config);
    let loaded = tracker.store_mut().load();
    debug!("Loaded {} stored entries", loaded);

    let mut service = TrackerService::new(tracker, &ctx.config);
    if let Some(sync) = RemoteSync::from_config(&ctx.config.sync)? {
        info!("Remote sync enabled");
        service = service.with_sync(sync);
    }

    let (tx, rx) = mpsc::channel(64);
    let runtime = tokio::spawn(service.run(rx));

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &input {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).lines();
    let pace = pace_ms.map(Duration::from_millis);

    let mut sent = 0usize;
    let mut skipped = 0usize;
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command: TrackerCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                skipped += 1;
                continue;
            }
        };

        if tx.send(command).await.is_err() {
            return Err(FormKeepError::Other("tracker runtime stopped early".to_string()));
        }
        sent += 1;

        if let Some(pace) = pace {
            tokio::time::sleep(pace).await;
        }
    }

    drop(tx);
    let tracker = runtime
        .await
        .map_err(|e| FormKeepError::Other(format!("tracker runtime failed: {}", e)))?;

    println!(
        "Replayed {} command(s), skipped {}; {} entries in store ({} writes)",
        sent,
        skipped,
        tracker.store().len(),
        tracker.store().persisted_writes()
    );

    Ok(())
}
