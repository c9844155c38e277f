//! Error types for the nanotools client.
//!
//! Every controller action returns `Result<_, ToolError>` and also records the
//! error's message in its UI state. The `Display` text of each variant is the
//! exact message a user sees, so callers can show `err.to_string()` without
//! any further mapping.
//!
//! The variants follow the four failure families a tool can hit:
//!
//! * **Validation** — missing input, wrong type, oversize. Raised before any
//!   request is sent.
//! * **Server / Transport** — the backend answered with a non-OK status, or
//!   the request never completed.
//! * **InvalidResponse** — the backend answered OK but the JSON is missing
//!   the fields the tool needs.
//! * **Platform** — clipboard, download sink or file source failures.

use std::path::PathBuf;
use thiserror::Error;

/// Message used when a successful response does not have the expected shape.
pub const INVALID_RESPONSE: &str = "Invalid response from server";

/// All errors surfaced by the tool controllers.
#[derive(Debug, Error)]
pub enum ToolError {
    // ── Client-side validation ────────────────────────────────────────────
    /// Input rejected before dispatch. The string is shown verbatim.
    #[error("{0}")]
    Validation(String),

    // ── Backend errors ────────────────────────────────────────────────────
    /// The backend returned a non-OK status. `message` is the response body
    /// text, or the action's generic fallback when the body was empty.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The backend returned OK but the body is missing required fields.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// The request could not be sent or its body could not be read.
    #[error("{0}")]
    Transport(String),

    // ── Platform errors ───────────────────────────────────────────────────
    /// The clipboard refused the write.
    #[error("{0}")]
    Clipboard(String),

    /// Reading a picked file or writing a download failed.
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Controller errors ─────────────────────────────────────────────────
    /// Another action of the same controller is still in flight.
    #[error("Another request is already in progress")]
    Busy,

    /// A result item was requested that does not exist.
    #[error("No result at position {0}")]
    NotFound(usize),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ToolError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ToolError::Validation(msg.into())
    }

    /// The message to show the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the error was raised before anything was sent to the backend.
    pub fn is_client_side(&self) -> bool {
        matches!(self, ToolError::Validation(_) | ToolError::Busy)
    }

    /// HTTP status of a backend rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_verbatim() {
        let e = ToolError::validation("File too large. Maximum size is 10MB.");
        assert_eq!(e.to_string(), "File too large. Maximum size is 10MB.");
        assert!(e.is_client_side());
    }

    #[test]
    fn server_display_is_body_text() {
        let e = ToolError::Server {
            status: 400,
            message: "unsupported output format: bmp".into(),
        };
        assert_eq!(e.to_string(), "unsupported output format: bmp");
        assert_eq!(e.status(), Some(400));
        assert!(!e.is_client_side());
    }

    #[test]
    fn invalid_response_matches_constant() {
        assert_eq!(ToolError::InvalidResponse.to_string(), INVALID_RESPONSE);
    }

    #[test]
    fn io_display_names_path() {
        let e = ToolError::Io {
            path: PathBuf::from("/tmp/x.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.user_message().contains("/tmp/x.png"));
    }
}
