//! Core error types.

use thiserror::Error;

use crate::path::BufferPath;

/// Errors raised while shaping, splitting, or applying state.
#[derive(Debug, Error)]
pub enum StateError {
    /// A value could not be represented as synchronizable state.
    #[error("invalid state shape: {0}")]
    InvalidShape(String),

    /// A buffer path did not resolve to a container slot in the plain state.
    #[error("buffer path {path} does not resolve in the plain state")]
    BadBufferPath {
        /// The offending path.
        path: BufferPath,
    },

    /// `buffer_paths` and `buffers` are not positionally aligned.
    #[error("buffer path/payload mismatch: {paths} paths, {buffers} buffers")]
    BufferCountMismatch {
        /// Number of buffer paths received.
        paths: usize,
        /// Number of buffer payloads received.
        buffers: usize,
    },

    /// The model rejected a field assignment. The model's own validation
    /// semantics are authoritative; this is surfaced unchanged.
    #[error("cannot assign state key `{key}`: {message}")]
    Assign {
        /// The state key being assigned.
        key: String,
        /// The model's rejection message.
        message: String,
    },
}

/// Protocol violations from the peer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer sent a message with a method this side does not implement.
    /// Usually indicates version skew between host and front end.
    #[error("unrecognized method: {0}")]
    UnrecognizedMethod(String),

    /// The message body was missing a required field or had the wrong type.
    #[error("malformed message: {0}")]
    Malformed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;

    #[test]
    fn unrecognized_method_names_the_method() {
        let err = ProtocolError::UnrecognizedMethod("bogus".to_string());
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn bad_buffer_path_displays_the_path() {
        let err = StateError::BadBufferPath {
            path: BufferPath::from(vec![
                PathSegment::Key("x".to_string()),
                PathSegment::Index(3),
            ]),
        };
        assert!(err.to_string().contains("x/3"));
    }
}
