use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// `*.md` files directly under `dir`, sorted. Names starting with `_` are templates and skipped.
pub fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} directory not found", dir.display());
    }

    let dir_str = dir
        .to_str()
        .with_context(|| format!("Non UTF-8 path: {}", dir.display()))?;
    let pattern = format!("{}/*.md", glob::Pattern::escape(dir_str));

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .context("Invalid glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect();
    files.sort();
    Ok(files)
}
