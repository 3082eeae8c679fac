//! Tenant identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted tenant id length.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Identifier of one visitor in the multi-tenant deployment.
///
/// The value arrives in a client cookie and is used verbatim as a database file
/// name, so parsing only accepts `[A-Za-z0-9_-]`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse and validate a tenant id.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidTenantId("empty".to_string()));
        }
        if s.len() > MAX_TENANT_ID_LEN {
            return Err(crate::Error::InvalidTenantId(format!(
                "longer than {MAX_TENANT_ID_LEN} characters"
            )));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(crate::Error::InvalidTenantId(format!(
                "unexpected character {c:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_hex_and_simple_names() {
        assert_eq!(TenantId::parse("abc123").unwrap().as_str(), "abc123");
        assert!(TenantId::parse("tenant_1-a").is_ok());
        let minted = "0123456789abcdef0123456789abcdef0123456789abcdef";
        assert_eq!(TenantId::parse(minted).unwrap().to_string(), minted);
    }

    #[test]
    fn test_parse_rejects_path_components() {
        assert!(TenantId::parse("").is_err());
        assert!(TenantId::parse("../etc/passwd").is_err());
        assert!(TenantId::parse("a/b").is_err());
        assert!(TenantId::parse("a.db").is_err());
        assert!(TenantId::parse("with space").is_err());
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let long = "a".repeat(MAX_TENANT_ID_LEN + 1);
        assert!(TenantId::parse(&long).is_err());
        let max = "a".repeat(MAX_TENANT_ID_LEN);
        assert!(TenantId::parse(&max).is_ok());
    }
}
