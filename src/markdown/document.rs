use anyhow::{Context, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Header text that identifies the action-item table.
#[derive(Debug, Clone)]
pub struct TableMarkers {
    pub project: String,
    pub link: String,
}

impl Default for TableMarkers {
    fn default() -> Self {
        Self {
            project: "| Project".into(),
            link: "Link".into(),
        }
    }
}

/// Line range of a table: the header through the last contiguous pipe-prefixed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpan {
    pub start: usize,
    pub end: usize,
}

impl TableSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

pub fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// A markdown file split on `\n`. Joining the lines back gives the original bytes.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    lines: Vec<String>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: text.split('\n').map(String::from).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn set_line(&mut self, idx: usize, line: String) {
        self.lines[idx] = line;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// First table whose header carries both markers.
    pub fn find_table(&self, markers: &TableMarkers) -> Option<TableSpan> {
        let start = self
            .lines
            .iter()
            .position(|line| line.contains(&markers.project) && line.contains(&markers.link))?;
        let end = self.lines[start..]
            .iter()
            .position(|line| !is_table_line(line))
            .map(|offset| start + offset)
            .unwrap_or(self.lines.len());
        Some(TableSpan { start, end })
    }

    pub fn table_lines(&self, span: TableSpan) -> &[String] {
        &self.lines[span.range()]
    }

    pub fn replace_range(&mut self, span: TableSpan, lines: Vec<String>) {
        self.lines.splice(span.range(), lines);
    }

    /// Writes the whole document back, but only when something changed.
    pub fn save_if_modified(&self, modified: usize) -> Result<bool> {
        if modified == 0 {
            return Ok(false);
        }
        std::fs::write(&self.path, self.text())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(true)
    }
}
