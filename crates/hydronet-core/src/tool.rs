use serde::{Deserialize, Serialize};

/// Lifecycle state of a tool invocation.
///
/// `Running` moves to exactly one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
}

impl ToolStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Label shown on a tool card.
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "⏳ 执行中...",
            Self::Completed => "✅ 完成",
            Self::Failed => "❌ 失败",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("simulation", "水网仿真"),
    ("identification", "系统辨识"),
    ("scheduling", "优化调度"),
    ("control", "控制策略"),
    ("testing", "性能测试"),
];

/// Translates a backend tool name into its display name.
///
/// Names outside the fixed table are returned unchanged.
pub fn display_name(tool_name: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(name, _)| *name == tool_name)
        .map(|(_, display)| *display)
        .unwrap_or(tool_name)
}
