use serde::Deserialize;
use std::fmt;

/// Linear's numeric priority tiers. Meeting notes write them in Korean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    None,
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Unknown labels fall back to `Priority::None` instead of failing the row.
    pub fn from_label(label: &str) -> Self {
        let label = label.replace("**", "");
        match label.trim() {
            "즉시" => Priority::Urgent,
            "단기" => Priority::High,
            "중기" => Priority::Normal,
            "장기" => Priority::Low,
            other => match other.to_ascii_lowercase().as_str() {
                "urgent" => Priority::Urgent,
                "high" => Priority::High,
                "normal" | "medium" => Priority::Normal,
                "low" => Priority::Low,
                _ => Priority::None,
            },
        }
    }

    pub fn as_linear(&self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::Urgent => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::Low => 4,
        }
    }
}

/// Workflow state category as reported by `state { type }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Triage,
    Backlog,
    Unstarted,
    Started,
    Completed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl StateType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StateType::Completed | StateType::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::Triage => "triage",
            StateType::Backlog => "backlog",
            StateType::Unstarted => "unstarted",
            StateType::Started => "started",
            StateType::Completed => "completed",
            StateType::Canceled => "canceled",
            StateType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for `issueCreate`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub team_id: String,
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub project_id: Option<String>,
    pub state_id: Option<String>,
}

/// An issue that exists in Linear, e.g. `OPS-5`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueRef {
    pub identifier: String,
    pub url: String,
}

impl IssueRef {
    pub fn markdown_link(&self) -> String {
        format!("[{}]({})", self.identifier, self.url)
    }
}
