use thiserror::Error;

/// Errors produced while encoding or decoding a process-instance envelope.
///
/// All of these are fatal for the current call: the codec performs no
/// retries and publishes nothing on failure. The caller decides whether
/// to retry with different input, discard the execution, or alert an
/// operator.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A variable's runtime value matched no registered value strategy.
    /// Configuration error on the write side, version/configuration skew
    /// on the read side.
    #[error("no value strategy accepts variable {variable:?} of type {value_type}")]
    NoStrategyFound { variable: String, value_type: String },

    /// Decode saw a node-instance variant tag outside the closed set.
    /// Indicates writer/reader version skew; execution state must not be
    /// silently dropped.
    #[error("unknown node instance variant tag {tag:?}")]
    UnknownNodeInstanceVariant { tag: String },

    /// An exclusive group names a node instance that does not exist in
    /// the same workflow context. Corrupt or truncated input.
    #[error("exclusive group references missing node instance {id:?}")]
    DanglingGroupReference { id: String },

    /// Structural violation: bad magic, truncated buffer, bad length
    /// prefix, invalid UTF-8, missing required field, trailing bytes.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
