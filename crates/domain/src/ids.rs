use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

macro_rules! define_id {
    ($name:ident, $repr:ty, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<$repr>()
                    .map(Self)
                    .map_err(|e| DomainError::parse(format!("invalid {}: {s:?} ({e})", $label)))
            }
        }
    };
}

// Stable platform identity (e.g. a SteamID64). Survives reconnects.
define_id!(UserId, u64, "user id");

// Host-assigned player slot. The host may reuse a slot as soon as it is freed.
define_id!(PlayerSlot, i32, "player slot");

// Token minted per observed connect. Never reused within a process.
define_id!(ConnectionId, u64, "connection id");
