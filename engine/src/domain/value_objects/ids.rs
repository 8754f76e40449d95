//! Identifier value objects
//! Immutable UUID-backed identifiers for every addressable entity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from string
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a worker process record
    ProcessId
);
uuid_id!(
    /// Identifier of a browsing context
    TabId
);
uuid_id!(
    /// Identifier of a tab group
    GroupId
);
uuid_id!(
    /// Identifier of a space
    SpaceId
);
uuid_id!(
    /// Identifier of an IPC channel
    ChannelId
);
uuid_id!(
    /// Identifier of an IPC message, also used as correlation id
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let id1 = ProcessId::generate();
        let id2 = ProcessId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_from_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = TabId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!(SpaceId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = GroupId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
