//! Local identity: the sanitized "phone number" a user registers under.

use crate::core::config::{APP_PREFIX, MIN_IDENTITY_LEN};
use crate::core::error::ChatError;
use std::fmt;

/// Strip every character outside `[A-Za-z0-9]`.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Prepend the application namespace to an identifier.
pub fn namespaced(id: &str) -> String {
    format!("{APP_PREFIX}{id}")
}

/// Remove the application namespace for display. Names without the prefix
/// are returned unchanged.
pub fn strip_namespace(name: &str) -> &str {
    name.strip_prefix(APP_PREFIX).unwrap_or(name)
}

/// A validated identifier: non-empty, alphanumeric, at least
/// [`MIN_IDENTITY_LEN`] characters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Sanitize `raw` and validate the result.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let phone = sanitize(raw.trim());
        if phone.len() < MIN_IDENTITY_LEN {
            return Err(ChatError::InvalidIdentity);
        }
        Ok(Self(phone))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name registered with the transport.
    pub fn namespaced(&self) -> String {
        namespaced(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_non_alphanumerics() {
        assert_eq!(sanitize("abc123!!"), "abc123");
        assert_eq!(sanitize(" +1 (555) 010-2030 "), "15550102030");
        assert_eq!(sanitize("ünï-cödé"), "ncd");
        assert_eq!(sanitize("!!!"), "");
    }

    #[test]
    fn parse_accepts_three_or_more() {
        let id = Identity::parse("abc123!!").unwrap();
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.namespaced(), "stranger_abc123");
        assert!(Identity::parse("a-b-c").is_ok());
    }

    #[test]
    fn parse_rejects_short_identifiers() {
        assert_eq!(Identity::parse("ab"), Err(ChatError::InvalidIdentity));
        assert_eq!(Identity::parse("a!b?"), Err(ChatError::InvalidIdentity));
        assert_eq!(Identity::parse(""), Err(ChatError::InvalidIdentity));
    }

    #[test]
    fn namespace_round_trip_for_display() {
        assert_eq!(strip_namespace("stranger_bob42"), "bob42");
        assert_eq!(strip_namespace("bob42"), "bob42");
    }
}
