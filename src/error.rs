use thiserror::Error;

#[derive(Debug, Error)]
pub enum EegError {
    #[error("CSV error while {context}: {source}")]
    Csv {
        context: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error(
        "unresolvable channels {missing:?}; present in source: {present:?}; expected profile: {expected:?}"
    )]
    ChannelResolution {
        missing: Vec<String>,
        present: Vec<String>,
        expected: Vec<String>,
    },
    #[error("recording too short for minimum window: need {need} segments, got {got}")]
    InsufficientDuration { need: usize, got: usize },
    #[error(
        "taxonomy mismatch: checkpoint '{repo_id}' outputs {checkpoint} classes, requested {requested}"
    )]
    TaxonomyMismatch {
        repo_id: String,
        checkpoint: usize,
        requested: usize,
    },
    #[error("artifact unavailable for '{repo_id}': {message}")]
    ArtifactUnavailable { repo_id: String, message: String },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl EegError {
    pub(crate) fn csv(context: &'static str, source: csv::Error) -> Self {
        Self::Csv { context, source }
    }

    pub(crate) fn artifact(repo_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ArtifactUnavailable {
            repo_id: repo_id.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
