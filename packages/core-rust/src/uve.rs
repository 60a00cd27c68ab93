//! UVE key identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A UVE (User-Visible Entity) key: `table:name`.
///
/// `table` is drawn from a closed, configured set (e.g. `ObjectVRouter`);
/// `name` is opaque.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UveKey {
    pub table: String,
    pub name: String,
}

impl UveKey {
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for UveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.name)
    }
}

/// Error parsing a `UveKey` from its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed UVE key {0:?}: expected table:name")]
pub struct UveKeyParseError(pub String);

impl FromStr for UveKey {
    type Err = UveKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((table, name)) if !table.is_empty() => Ok(UveKey::new(table, name)),
            _ => Err(UveKeyParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_parse() {
        let key = UveKey::new("ObjectVRouter", "vr1");
        let rendered = key.to_string();
        assert_eq!(rendered, "ObjectVRouter:vr1");
        assert_eq!(rendered.parse::<UveKey>().unwrap(), key);
    }

    #[test]
    fn name_may_contain_colons() {
        let key: UveKey = "ObjectVRouter:vr1:eth0".parse().unwrap();
        assert_eq!(key.table, "ObjectVRouter");
        assert_eq!(key.name, "vr1:eth0");
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(":vr1".parse::<UveKey>().is_err());
    }

    #[test]
    fn missing_colon_is_rejected() {
        assert!("novalue".parse::<UveKey>().is_err());
    }
}
