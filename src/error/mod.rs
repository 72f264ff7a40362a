use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by a [`Chain`](crate::pipeline::chain::Chain).
///
/// Two families share this type:
///
/// - misuse of the chain itself (`EmptyChain`, `Reentrant`, `TerminalAppend`,
///   `TypeMismatch`, `UnknownStage`, `NotTail`) is returned from the call that
///   misused it;
/// - data-flow failures (`MissingValue`, `Pipeline`, `Stage`) travel forward
///   through the error signal and are only observed by stages and receivers.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("there must be at least one stage to run")]
    EmptyChain,

    #[error("chain is still running: its tail stage never reached a terminal state")]
    Reentrant,

    #[error("cannot append after terminal stage `{stage}`")]
    TerminalAppend { stage: &'static str },

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("stage is not part of this chain")]
    UnknownStage,

    #[error("stage at index {index} is not the tail of the chain")]
    NotTail { index: usize },

    #[error("`{stage}` got no value")]
    MissingValue { stage: &'static str },

    #[error("pipeline error: {context}")]
    Pipeline { context: &'static str },

    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn pipeline(context: &'static str) -> Self {
        Self::Pipeline { context }
    }

    pub fn stage_source<E>(stage: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Stage {
            stage,
            source: Arc::new(source),
        }
    }

    pub(crate) fn missing(stage: &'static str) -> Self {
        Self::MissingValue { stage }
    }

    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// `true` for errors that travel through the chain's error signal.
    pub fn is_data_flow(&self) -> bool {
        matches!(
            self,
            Self::MissingValue { .. } | Self::Pipeline { .. } | Self::Stage { .. }
        )
    }
}
