/*
 * Responsibility
 * - Validate record ids received from clients (24 hex characters)
 * - Generate new record ids for inserted documents
 * - Extractors and repos only go through this type, so the id format stays local to this file
 *
 * The error type is kept local (no thiserror) because nothing outside the
 * locator needs more than "this is not a record id".
 */
use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RECORD_ID_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIdError {
    InvalidLength { len: usize },
    InvalidCharacter { position: usize },
}

impl fmt::Display for RecordIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIdError::InvalidLength { len } => {
                write!(f, "record id must be {} hex characters, got {}", RECORD_ID_LEN, len)
            }
            RecordIdError::InvalidCharacter { position } => {
                write!(f, "record id has a non-hex character at position {}", position)
            }
        }
    }
}

impl Error for RecordIdError {}

/// A validated 24-character hexadecimal record id (lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self, RecordIdError> {
        if raw.len() != RECORD_ID_LEN {
            return Err(RecordIdError::InvalidLength { len: raw.len() });
        }
        if let Some(position) = raw.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(RecordIdError::InvalidCharacter { position });
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// New id: 4 bytes of unix seconds followed by 8 random bytes.
    ///
    /// Leading timestamp keeps ids roughly ordered by creation time.
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let random = Uuid::new_v4().as_u128() as u64;
        Self(format!("{:08x}{:016x}", secs, random))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
