use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

pub struct FileReader;

impl FileReader {
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "txt" | "md" | "markdown" => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read file: {:?}", path)),
            "pdf" => anyhow::bail!(
                "PDF input is not supported: convert {:?} to Markdown first",
                path
            ),
            _ => anyhow::bail!("Unsupported file format: {:?}", extension),
        }
    }

    /// Supported files below `dir`, recursively, in path order.
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk directory: {:?}", dir))?;
            if entry.file_type().is_file() && Self::is_supported(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();
        for path in Self::discover(dir)? {
            let content = Self::read_file(&path).await?;
            files.push((path.to_string_lossy().to_string(), content));
        }
        Ok(files)
    }
}
