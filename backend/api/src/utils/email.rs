//! Validated email addresses.
use core::fmt;
use std::sync::LazyLock;

use serde::Deserialize;
use thiserror::Error;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)+$")
        .expect("Email regex invalid")
});

/// An email address which has passed format validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct EmailAddress(String);

#[derive(Debug, Error)]
#[error("Invalid email address format")]
pub struct InvalidEmailError;

impl TryFrom<&str> for EmailAddress {
    type Error = InvalidEmailError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = InvalidEmailError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if EMAIL_REGEX.is_match(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidEmailError)
        }
    }
}

impl From<EmailAddress> for String {
    fn from(addr: EmailAddress) -> Self {
        let EmailAddress(s) = addr;
        s
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(EmailAddress::try_from("ada.lovelace+maths@example.co.uk").is_ok());
    }

    #[test]
    fn rejects_addresses_without_domain_dot() {
        assert!(EmailAddress::try_from("student@localhost").is_err());
        assert!(EmailAddress::try_from("not an email").is_err());
    }

    #[test]
    fn deserialising_validates() {
        let parsed: Result<EmailAddress, _> = serde_json::from_str("\"nobody\"");
        assert!(parsed.is_err());
        let parsed: EmailAddress = serde_json::from_str("\"a@b.io\"").unwrap();
        assert_eq!(parsed.as_ref(), "a@b.io");
    }
}
