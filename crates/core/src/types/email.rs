//! Email address type used by the login and registration forms.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty after trimming.
    #[error("email cannot be empty")]
    Empty,
    /// The backend stores emails in a 120 character column.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace between characters.
    #[error("email cannot contain spaces")]
    Whitespace,
    /// The input is not `local@domain`.
    #[error("email must look like name@domain")]
    Malformed,
}

/// An email address as typed into a storefront form.
///
/// Parsing trims surrounding whitespace and lowercases the domain; the local
/// part is left untouched. Only the shape is checked, the backend decides
/// whether the account exists.
///
/// ```
/// use atelier_core::Email;
///
/// let email = Email::parse("  Ana@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Ana@example.com");
///
/// assert!(Email::parse("ana").is_err());
/// assert!(Email::parse("ana@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length accepted by the backend user table.
    pub const MAX_LENGTH: usize = 120;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, contains
    /// whitespace, or does not have exactly one `@` with text on both sides.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::Malformed)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(EmailError::Malformed);
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_lowercases_domain() {
        let email = Email::parse(" Maria.Lopez@Galeria.ES\n").unwrap();
        assert_eq!(email.as_str(), "Maria.Lopez@galeria.es");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(120));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 120 })
        ));
    }

    #[test]
    fn test_parse_inner_whitespace() {
        assert_eq!(Email::parse("ana lopez@x.es"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@x.es"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("ana@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("ana@x@y"), Err(EmailError::Malformed));
    }

    #[test]
    fn test_serializes_as_string() {
        let email = Email::parse("ana@x.es").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ana@x.es\"");
    }
}
