//! Domain errors surfaced to the user.
//!
//! Every variant is recoverable: the UI shows its `Display` text as a toast
//! and returns to the previous stable screen. Plumbing failures (I/O, JSON,
//! network) travel as `anyhow::Error` and are converted at the edges.

use std::fmt;

/// Why a contact or dial request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Contact name was empty after trimming.
    MissingName,
    /// Identifier was empty after sanitizing.
    MissingPhone,
    /// A contact cannot point at the local identity.
    SelfContact,
    /// A dial cannot target the local identity.
    SelfDial,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => f.write_str("Contact name is required"),
            Self::MissingPhone => f.write_str("Contact number is required"),
            Self::SelfContact => f.write_str("You can't add yourself!"),
            Self::SelfDial => f.write_str("You can't call yourself!"),
        }
    }
}

/// User-facing error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Identifier failed the sanitize/length check.
    InvalidIdentity,
    /// Another endpoint already holds the requested identifier.
    DuplicateIdentity,
    /// Any other failure reported by the transport.
    Transport(String),
    /// Contact or dial input was rejected.
    Validation(ValidationError),
    /// A chat is already open.
    Busy,
    /// The contact list could not be written.
    Storage(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentity => f.write_str("Invalid Phone Number"),
            Self::DuplicateIdentity => f.write_str("Number already online! Close other sessions."),
            Self::Transport(kind) => write!(f, "Connection Error: {kind}"),
            Self::Validation(e) => e.fmt(f),
            Self::Busy => f.write_str("Already in a call. Hang up first."),
            Self::Storage(e) => write!(f, "Could not save contacts: {e}"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<ValidationError> for ChatError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_read_as_user_messages() {
        let err: ChatError = ValidationError::SelfDial.into();
        assert_eq!(err.to_string(), "You can't call yourself!");
    }

    #[test]
    fn transport_error_carries_kind() {
        let err = ChatError::Transport("network".into());
        assert_eq!(err.to_string(), "Connection Error: network");
    }
}
