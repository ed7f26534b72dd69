//! Error taxonomy for the tmux control-mode client.
//!
//! Every fallible public operation returns [`Result`]. Failures that should
//! not tear down a running session (a single malformed notification, an
//! unknown marker) are logged and dropped at the call site rather than
//! propagated — see the module docs on [`crate::notification`] and
//! [`crate::dispatcher`].

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TmuxError>;

/// All ways the control-mode client can fail.
#[derive(Debug, Error)]
pub enum TmuxError {
    /// The notification stream violated the line/envelope framing tmux
    /// guarantees (unexpected marker, missing `%end`/`%error` terminator,
    /// wrong token arity).
    #[error("protocol framing error: {0}")]
    ProtocolFraming(String),

    /// A `%begin … %error` envelope was returned for an issued command.
    #[error("tmux command failed: {0}")]
    CommandFailure(String),

    /// A layout string did not match tmux's layout grammar.
    #[error("malformed layout string: {0}")]
    LayoutMalformed(String),

    /// The child tmux process exited. Terminal: the owning session is done.
    #[error("tmux child process exited")]
    ChildLost,

    /// A command was issued while no session was bound.
    #[error("no active tmux connection")]
    NoConnection,

    /// Failed to spawn or otherwise communicate with the child process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
