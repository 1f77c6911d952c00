//! Client identity.
//!
//! Every settings collection belongs to one registered client. Scripts run on
//! behalf of that client, and the runaway-script guard keys its execution
//! history on the client's id, so an id must stay the same for as long as
//! the client is registered.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for ids derived from client names.
const CLIENT_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_52d0_8a3e_4b6f_9d27_c0a4_e5b1_7f38);

/// Identifier of a registered client.
///
/// Fresh ids are UUID v7. Clients registered only by name get a name-derived
/// UUID v5 instead, so reloading the same schema yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// A new, time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The stable id for a client known only by `name`. Names are trimmed
    /// and compared case-insensitively.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        let key = name.trim().to_lowercase();
        Self(Uuid::new_v5(&CLIENT_NAMESPACE, key.as_bytes()))
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Whether this id was derived from a client name.
    #[must_use]
    pub fn is_name_derived(&self) -> bool {
        self.0.get_version_num() == 5
    }

    /// Parses the hyphenated, simple or braced UUID forms. Surrounding
    /// whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let input = s.trim();
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|source| Error::InvalidClientId {
                input: input.to_string(),
                source,
            })
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
