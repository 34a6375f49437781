use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDestination {
    Results,
    Summary,
    Trace,
}

impl OutputDestination {
    pub const ALL: [OutputDestination; 3] = [Self::Results, Self::Summary, Self::Trace];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Results => "results",
            Self::Summary => "summary",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferKind {
    Statistics,
    Result,
    Summary,
    Trace,
}

impl BufferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::Result => "result",
            Self::Summary => "summary",
            Self::Trace => "trace",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Statistics => 0,
            Self::Result => 1,
            Self::Summary => 2,
            Self::Trace => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStage {
    Uninitialized,
    Initialized,
    Running,
    Finalized,
}

impl RecorderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    #[default]
    Iso8601,
    Rfc2822,
    #[serde(rename = "unix")]
    UnixSeconds,
    Elapsed,
}

impl TimeFormat {
    pub fn parse_cli(value: &str) -> Option<Self> {
        match value {
            "iso8601" => Some(Self::Iso8601),
            "rfc2822" => Some(Self::Rfc2822),
            "unix" => Some(Self::UnixSeconds),
            "elapsed" => Some(Self::Elapsed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iso8601 => "iso8601",
            Self::Rfc2822 => "rfc2822",
            Self::UnixSeconds => "unix",
            Self::Elapsed => "elapsed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Standard,
    Trace,
    Broadcast,
}

impl PolicyKind {
    pub fn parse_cli(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "trace" => Some(Self::Trace),
            "broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Trace => "trace",
            Self::Broadcast => "broadcast",
        }
    }
}
