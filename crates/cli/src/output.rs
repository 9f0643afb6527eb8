use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use analysis::ReportEmitter;
use pipeline::PipelineOutput;

pub const STATISTICS_FILE: &str = "statistics.json";
pub const RUN_FILE: &str = "run.json";

/// Writes `statistics.json`, the rendered report and `run.json` under
/// `<root>/<document_key>/`. Returns that directory.
pub fn write_outputs(
    root: &Path,
    output: &PipelineOutput,
    emitter: &dyn ReportEmitter,
) -> Result<PathBuf> {
    let dir = root.join(output.summary.document.as_str());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let statistics = serde_json::to_vec_pretty(&output.statistics)
        .context("Failed to serialize statistics")?;
    let run = serde_json::to_vec_pretty(&output.summary).context("Failed to serialize run summary")?;
    let report = emitter.render(&output.statistics);

    write_atomic(&dir.join(STATISTICS_FILE), &statistics)?;
    write_atomic(&dir.join(emitter.file_name()), report.as_bytes())?;
    write_atomic(&dir.join(RUN_FILE), &run)?;
    Ok(dir)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to write {:?}", path));
    }
    Ok(())
}
