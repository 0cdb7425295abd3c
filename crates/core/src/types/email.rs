//! Contact email addresses for customers and suppliers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// Nothing left after trimming.
    #[error("email cannot be empty")]
    Empty,
    /// Longer than the RFC 5321 path limit.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Not exactly one `@`.
    #[error("email must contain exactly one @")]
    AtSymbol,
    /// The mailbox part before `@` is empty or too long.
    #[error("email local part must be 1-{max} characters")]
    LocalPart {
        /// Maximum allowed length.
        max: usize,
    },
    /// The domain has no dot or an empty label.
    #[error("email domain {0:?} is not a valid host name")]
    Domain(String),
    /// Whitespace or control characters inside the address.
    #[error("email must not contain whitespace or control characters")]
    InvalidCharacter,
}

/// An email address, stored as entered (minus surrounding whitespace).
///
/// Uniqueness is case-insensitive; compare [`Email::normalized`] forms
/// rather than the raw strings.
///
/// ```
/// use shopkeep_core::Email;
///
/// let email = Email::parse(" Ada@Example.org ").unwrap();
/// assert_eq!(email.as_str(), "Ada@Example.org");
/// assert_eq!(email.normalized(), "ada@example.org");
///
/// assert!(Email::parse("ada@localhost").is_err());
/// assert!(Email::parse("a@b@example.org").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Maximum length of the local part (RFC 5321).
    pub const MAX_LOCAL_LENGTH: usize = 64;

    /// Parse an address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(EmailError::InvalidCharacter);
        }

        let mut parts = trimmed.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::AtSymbol);
        };
        if local.is_empty() || local.len() > Self::MAX_LOCAL_LENGTH {
            return Err(EmailError::LocalPart {
                max: Self::MAX_LOCAL_LENGTH,
            });
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(EmailError::Domain(domain.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or("", |(local, _)| local)
    }

    /// Part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }

    /// Lowercase form used for case-insensitive uniqueness.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
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

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.0.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let email = Email::parse("orders+eu@shop.example.co.uk").unwrap();
        assert_eq!(email.local_part(), "orders+eu");
        assert_eq!(email.domain(), "shop.example.co.uk");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at.example.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@example.com"), Err(EmailError::AtSymbol));
        assert!(matches!(
            Email::parse("@example.com"),
            Err(EmailError::LocalPart { .. })
        ));
        assert!(matches!(
            Email::parse("ada@example..com"),
            Err(EmailError::Domain(_))
        ));
        assert_eq!(
            Email::parse("ada lovelace@example.com"),
            Err(EmailError::InvalidCharacter)
        );
    }

    #[test]
    fn test_length_limits() {
        let local = "a".repeat(Email::MAX_LOCAL_LENGTH + 1);
        assert!(matches!(
            Email::parse(&format!("{local}@example.com")),
            Err(EmailError::LocalPart { .. })
        ));

        let domain = format!("{}.com", "d".repeat(Email::MAX_LENGTH));
        assert!(matches!(
            Email::parse(&format!("a@{domain}")),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_normalized_keeps_original() {
        let email = Email::parse("Jane.Doe@Example.COM").unwrap();
        assert_eq!(email.normalized(), "jane.doe@example.com");
        assert_eq!(email.as_str(), "Jane.Doe@Example.COM");
    }

    #[test]
    fn test_serde_validates() {
        let email: Email = serde_json::from_str("\"ada@example.org\"").unwrap();
        assert_eq!(email.to_string(), "ada@example.org");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
