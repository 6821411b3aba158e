use crate::foundation::QuorumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

macro_rules! define_row_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

define_string_id!(AccountId);
define_string_id!(NodeId);
define_string_id!(NetworkName);

define_row_id!(TransactionId);
define_row_id!(GroupId);
define_row_id!(RowId);

/// Opaque public-key identity. Comparable for equality only; never interpreted.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct KeyBytes(Vec<u8>);

impl KeyBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for KeyBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for KeyBytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

/// Natural key of a cached entity: the remote entity id scoped to a network.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct EntityKey {
    pub network: NetworkName,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(network: NetworkName, entity_id: impl Into<String>) -> Self {
        Self { network, entity_id: entity_id.into() }
    }

    pub fn for_account(network: NetworkName, account_id: &AccountId) -> Self {
        Self::new(network, account_id.as_str())
    }

    pub fn for_node(network: NetworkName, node_id: &NodeId) -> Self {
        Self::new(network, node_id.as_str())
    }

    /// Rejects empty ids and empty networks before any storage or remote call is made.
    pub fn validate(&self) -> Result<(), QuorumError> {
        if self.network.trim().is_empty() {
            return Err(QuorumError::InvalidEntityKey("network must not be empty".to_string()));
        }
        if self.entity_id.trim().is_empty() {
            return Err(QuorumError::InvalidEntityKey("entity id must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.entity_id)
    }
}
