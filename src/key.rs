//! Query keys.
//!
//! A [QueryKey] is the normalized form of a domain name. It indexes both
//! the result cache and the coalescer, so two spellings of the same name
//! must normalize to the same key: ASCII characters are case-folded and
//! the name always carries a single trailing dot.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

//------------ QueryKey -------------------------------------------------------

/// A normalized domain name.
///
/// Immutable once constructed. Construction rejects empty names and names
/// with empty labels, everything else is taken as-is. The key makes no
/// attempt at full presentation-format parsing; the inventory backend is
/// the authority on which names exist.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QueryKey {
    /// The normalized name: lower case, single trailing dot.
    name: Box<str>,
}

impl QueryKey {
    /// Creates a key from a domain name in presentation format.
    ///
    /// Accepts the name with or without a trailing dot.
    pub fn new(name: &str) -> Result<Self, KeyError> {
        let relative = name.strip_suffix('.').unwrap_or(name);
        if relative.is_empty() {
            return Err(KeyError::Empty);
        }
        let mut normalized = String::with_capacity(relative.len() + 1);
        for label in relative.split('.') {
            if label.is_empty() {
                return Err(KeyError::EmptyLabel);
            }
            normalized.extend(label.chars().map(|ch| ch.to_ascii_lowercase()));
            normalized.push('.');
        }
        Ok(Self {
            name: normalized.into(),
        })
    }

    /// Returns the normalized name.
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl FromStr for QueryKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(&self.name)
    }
}

//------------ KeyError -------------------------------------------------------

/// A domain name could not be turned into a query key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyError {
    /// The name was empty or consisted only of a dot.
    Empty,

    /// The name contained an empty label.
    EmptyLabel,
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            KeyError::Empty => write!(f, "empty domain name"),
            KeyError::EmptyLabel => {
                write!(f, "domain name contains an empty label")
            }
        }
    }
}

impl error::Error for KeyError {}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_trailing_dot() {
        let key = QueryKey::new("host.example.com").unwrap();
        assert_eq!(key.as_str(), "host.example.com.");
    }

    #[test]
    fn keeps_existing_trailing_dot() {
        let key = QueryKey::new("host.example.com.").unwrap();
        assert_eq!(key.as_str(), "host.example.com.");
    }

    #[test]
    fn case_folds() {
        let upper = QueryKey::new("Host.Example.COM.").unwrap();
        let lower = QueryKey::new("host.example.com").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(QueryKey::new(""), Err(KeyError::Empty));
        assert_eq!(QueryKey::new("."), Err(KeyError::Empty));
    }

    #[test]
    fn rejects_empty_label() {
        assert_eq!(
            QueryKey::new("host..example.com"),
            Err(KeyError::EmptyLabel)
        );
        assert_eq!(QueryKey::new(".example.com"), Err(KeyError::EmptyLabel));
    }

    #[test]
    fn parses_from_str() {
        let key: QueryKey = "host.example.com".parse().unwrap();
        assert_eq!(key.to_string(), "host.example.com.");
    }
}
