use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from a string
            pub fn from_string(id: String) -> Self {
                Self(id)
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a queue aggregate
    QueueId
);

string_id!(
    /// Unique identifier for one admission into a roster
    ClientId
);

string_id!(
    /// Identifier of the person behind an admission (owned by the auth system)
    UserId
);

impl QueueId {
    /// Generate a new unique queue ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for QueueId {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientId {
    /// Generate a new unique client ID
    pub fn new() -> Self {
        Self(format!("client_{}", Uuid::new_v4().simple()))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}
