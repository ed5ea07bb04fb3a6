use thiserror::Error;

use crate::component::ComponentId;

/// Errors raised while building or driving a reactor.
#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("failed to build reactor runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to spawn branch thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid reactor config: {0}")]
    InvalidConfig(String),

    #[error("malformed reactor config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Misuse of the ownership tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("component {child} is not a registered child of {parent}")]
    NotAChild {
        parent: ComponentId,
        child: ComponentId,
    },
}

/// Failure to invoke a callback.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CallbackError {
    #[error("callback invoked without a bound callable")]
    Unbound,

    #[error("callback target has been dropped")]
    Expired,
}
