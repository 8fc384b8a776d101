use regex::Regex;
use std::sync::LazyLock;

/// Leading blank, project, priority, item, description, due, link.
pub const MIN_SEGMENTS: usize = 7;

const PROJECT: usize = 1;
const PRIORITY: usize = 2;
const ITEM: usize = 3;
const DESCRIPTION: usize = 4;
const DUE: usize = 5;
const LINK: usize = 6;

const STRIKE: &str = "~~";

static ISSUE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Z][A-Z0-9]*-\d+)\]\((https://linear\.app/[^)\s]+)\)")
        .expect("valid issue link regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Row(TableRow),
    /// Fewer than [`MIN_SEGMENTS`] cells; kept verbatim.
    Malformed(String),
}

impl ParsedRow {
    pub fn parse(line: &str) -> Self {
        let segments: Vec<String> = line.split('|').map(String::from).collect();
        if segments.len() < MIN_SEGMENTS {
            ParsedRow::Malformed(line.to_string())
        } else {
            ParsedRow::Row(TableRow { segments })
        }
    }
}

/// One action-item row. Segments are kept raw so untouched cells keep their padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    segments: Vec<String>,
}

impl TableRow {
    fn cell(&self, idx: usize) -> &str {
        self.segments[idx].trim()
    }

    /// Project name with bold markers removed.
    pub fn project(&self) -> String {
        self.cell(PROJECT).replace("**", "").trim().to_string()
    }

    pub fn priority(&self) -> &str {
        self.cell(PRIORITY)
    }

    pub fn item(&self) -> &str {
        self.cell(ITEM)
    }

    pub fn description(&self) -> &str {
        self.cell(DESCRIPTION)
    }

    pub fn due(&self) -> &str {
        self.cell(DUE)
    }

    pub fn link(&self) -> &str {
        self.cell(LINK)
    }

    /// Identifier of the Linear issue referenced in the link cell, if any.
    pub fn linked_identifier(&self) -> Option<&str> {
        ISSUE_LINK
            .captures(self.link())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn set_link(&mut self, markdown: &str) {
        self.segments[LINK] = format!(" {markdown} ");
    }

    pub fn is_struck(&self) -> bool {
        let item = self.item();
        item.len() >= 2 * STRIKE.len() && item.starts_with(STRIKE) && item.ends_with(STRIKE)
    }

    /// Wraps the item text in `~~`. Returns false when there was nothing to do.
    pub fn strike_item(&mut self) -> bool {
        let item = self.item().to_string();
        if item.is_empty() || self.is_struck() {
            return false;
        }
        let struck = format!("{STRIKE}{item}{STRIKE}");
        self.segments[ITEM] = self.segments[ITEM].replacen(&item, &struck, 1);
        true
    }

    pub fn to_line(&self) -> String {
        self.segments.join("|")
    }
}
