//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates should *not* pass raw `Uuid`s around: a `BatchId` must
//! never be confused with the `TenantId` that scopes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const fn from_uuid(v: Uuid) -> Self {
                Self(v)
            }
            pub const fn from_u128(v: u128) -> Self {
                Self(Uuid::from_u128(v))
            }
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }
            pub const fn get(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

new_id!(BatchId);
new_id!(RelationId);
new_id!(TenantId);
new_id!(SiteId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_uuid_strings() {
        let id = BatchId::from_u128(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000007\"");
        let back: BatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        let t: TenantId = " 00000000-0000-0000-0000-00000000002a ".parse().unwrap();
        assert_eq!(t, TenantId::from_u128(42));
        assert!("not-a-uuid".parse::<TenantId>().is_err());
    }
}
