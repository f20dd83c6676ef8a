//! Newtyped identities for the entities the orchestrator manages.
//!
//! All record identities are UUIDs; tenants are opaque strings assigned by
//! the identity service and are kept as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identity.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identity of a firewall record.
    FirewallId
);

uuid_id!(
    /// Identity of a firewall policy record.
    PolicyId
);

uuid_id!(
    /// Identity of a firewall rule record.
    RuleId
);

uuid_id!(
    /// Identity of a network attachment point (router).
    RouterId
);

/// Identity of the tenant owning a resource.
///
/// Tenant identifiers come from the external identity service and are
/// treated as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firewall_id_roundtrip() {
        let id = FirewallId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: FirewallId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(FirewallId::new(), FirewallId::new());
        assert_ne!(RouterId::new(), RouterId::new());
    }

    #[test]
    fn test_tenant_id_display() {
        let tenant = TenantId::new("acme");
        assert_eq!(tenant.as_str(), "acme");
        assert_eq!(tenant.to_string(), "acme");
    }

    #[test]
    fn test_id_serializes_transparent() {
        let id = FirewallId::new();
        let json = serde_json::to_value(id).unwrap();
        assert!(json.is_string());
    }
}
