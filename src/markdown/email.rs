//! Email notes: a `# Email: <subject>` heading, a metadata list, and a
//! `**Linear Issue**:` line that links the note to its issue.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

const ISSUE_TAG: &str = "**Linear Issue**:";
const LEGACY_TAG: &str = "**Linear Doc**:";

static SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#\s+Email:[ \t]*(.+?)[ \t\r]*$").expect("valid subject regex")
});

static ISSUE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*Linear Issue\*\*:[ \t]*(https://linear\.app/\S+)")
        .expect("valid issue url regex")
});

static LEGACY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*Linear Doc\*\*:[ \t]*(https://linear\.app/\S+)")
        .expect("valid doc url regex")
});

static URL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/issue/([a-zA-Z0-9-]+)").expect("valid identifier regex"));

static EMPTY_ISSUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(\*\*Linear Issue\*\*:)[ \t]*(\r?)$").expect("valid empty tag regex")
});

static LEGACY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Linear Doc\*\*:[^\r\n]*").expect("valid legacy line regex"));

static TO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- \*\*To\*\*:[^\n]*\n").expect("valid to line regex"));

pub fn issue_title(content: &str) -> String {
    match SUBJECT.captures(content).and_then(|c| c.get(1)) {
        Some(subject) => format!("[Email] {}", subject.as_str()),
        None => "[Email] Email Note".to_string(),
    }
}

/// URL after `**Linear Issue**:`, falling back to the legacy `**Linear Doc**:` tag.
pub fn linked_url(content: &str) -> Option<String> {
    ISSUE_URL
        .captures(content)
        .or_else(|| LEGACY_URL.captures(content))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// `https://linear.app/ws/issue/PAC-123/title` -> `PAC-123`.
pub fn url_identifier(url: &str) -> Option<String> {
    URL_IDENTIFIER
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn uses_legacy_tag(content: &str) -> bool {
    content.contains(LEGACY_TAG)
}

/// Records `url` in the note: fills an empty issue line, converts a legacy line,
/// or adds one after the `To` metadata line (or at the end).
pub fn attach_issue_url(content: &str, url: &str) -> String {
    if content.contains(ISSUE_TAG) {
        let filled = EMPTY_ISSUE_LINE.replace(content, |caps: &regex::Captures| {
            format!("{} {url}{}", &caps[1], &caps[2])
        });
        return filled.into_owned();
    }

    if content.contains(LEGACY_TAG) {
        let line = format!("{ISSUE_TAG} {url}");
        return LEGACY_LINE.replace(content, NoExpand(&line)).into_owned();
    }

    if let Some(to_line) = TO_LINE.find(content) {
        let mut updated = String::with_capacity(content.len() + url.len() + 24);
        updated.push_str(&content[..to_line.end()]);
        updated.push_str(&format!("- {ISSUE_TAG} {url}\n"));
        updated.push_str(&content[to_line.end()..]);
        return updated;
    }

    let mut updated = content.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("- {ISSUE_TAG} {url}\n"));
    updated
}
