//! Report persistence: the single durable artifact of a run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use goldscreen_core::ScanReport;

use crate::error::CliError;

/// Serialize the report to disk.
///
/// This is the one fail-loud path in the whole pipeline: a run that cannot
/// persist its report produced no usable artifact, so the error propagates
/// to the exit code.
pub fn write_report(report: &ScanReport, path: &Path, pretty: bool) -> Result<(), CliError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(&mut writer, report)?;
    } else {
        serde_json::to_writer(&mut writer, report)?;
    }
    writer.flush()?;

    Ok(())
}
