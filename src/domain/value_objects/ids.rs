//! Strongly-typed identifiers for domain entities
//!
//! Ids serialize as UUID strings. Snapshots written by the browser tracker use
//! `Date.now()` strings instead; those are mapped onto a name-based UUID so the
//! same legacy id always lands on the same value.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// An id as found on the wire: a UUID, any other string, or a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    fn into_uuid(self) -> Uuid {
        match self {
            RawId::Text(text) => {
                Uuid::parse_str(&text).unwrap_or_else(|_| legacy_uuid(&text))
            }
            RawId::Number(n) => legacy_uuid(&n.to_string()),
        }
    }
}

fn legacy_uuid(raw: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes())
}

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_uuid()))
            }
        }

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(CombatantId);
define_id!(LogEntryId);
define_id!(HistoryId);
define_id!(CharacterId);
define_id!(NpcId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_ids_round_trip_unchanged() {
        let id = CombatantId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<CombatantId>(&json).unwrap(), id);
    }

    #[test]
    fn test_legacy_ids_map_to_stable_values() {
        let a: CombatantId = serde_json::from_str(r#""1700000000000""#).unwrap();
        let b: CombatantId = serde_json::from_str(r#""1700000000000""#).unwrap();
        let c: CombatantId = serde_json::from_str(r#""1700000000001-abc123xyz""#).unwrap();
        let n: CombatantId = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, n);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_str_stays_strict() {
        assert!("1700000000000".parse::<CombatantId>().is_err());
    }
}
