//! Simulator error types

use thiserror::Error;

/// Errors from configuring or driving a virtual switch
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid console name {0:?}")]
    InvalidName(String),

    #[error("a switch needs at least one output card")]
    NoOutputs,

    #[error("no output card at slot {0}")]
    NoSuchOutput(i64),
}
