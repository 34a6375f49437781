use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recording init failed: {source}")]
    RecordingInitFailed {
        #[source]
        source: Box<RecorderError>,
    },
    #[error("recording commit to [{group}] failed: {source}")]
    RecordingCommitFailed {
        group: String,
        #[source]
        source: Box<RecorderError>,
    },
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl RecorderError {
    pub fn init_failed(source: RecorderError) -> Self {
        Self::RecordingInitFailed {
            source: Box::new(source),
        }
    }

    pub fn commit_failed(group: impl Into<String>, source: RecorderError) -> Self {
        Self::RecordingCommitFailed {
            group: group.into(),
            source: Box::new(source),
        }
    }

    /// Innermost error in a wrapped chain.
    pub fn root_cause(&self) -> &RecorderError {
        match self {
            Self::RecordingInitFailed { source } | Self::RecordingCommitFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
