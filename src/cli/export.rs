//! Backup export command

use super::helpers::CliContext;
use formkeep_core::{error::Result, ExportFormat};
use std::{io::Write, path::PathBuf};
use tracing::debug;

/// Handle export command
///
/// The format defaults to the output file's extension, then JSON.
pub fn handle(
    ctx: &CliContext,
    format: Option<String>,
    form_id: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let format = match format {
        Some(format) => format.parse::<ExportFormat>()?,
        None => infer_format(output.as_ref()),
    };

    if let Some(ref out_path) = output {
        debug!("Exporting backups to {}...", out_path.display());
    } else {
        debug!("Exporting backups to stdout...");
    }

    let body = ctx
        .dashboard()?
        .export_backup_data(form_id.as_deref(), format)?;

    match output {
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(body.as_bytes())?;
            handle.write_all(b"\n")?;
        }
        Some(path) => {
            let mut file = std::fs::File::create(&path)?;
            file.write_all(body.as_bytes())?;
            file.write_all(b"\n")?;
            eprintln!(" Exported backups to {}", path.display());
        }
    }

    Ok(())
}

fn infer_format(output: Option<&PathBuf>) -> ExportFormat {
    match output.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
        _ => ExportFormat::Json,
    }
}
