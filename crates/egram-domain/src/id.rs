//! Identifiers for stored files.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngExt;
use serde::{Deserialize, Serialize};

/// Every file identifier starts with this prefix; it doubles as the storage key namespace.
pub const FILE_ID_PREFIX: &str = "file_";

/// Length of the random base-36 tail of a generated identifier.
pub const FILE_ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid file identifier")]
pub struct InvalidFileId;

/// Identifies a stored file: `file_<unix-millis>_<lowercase alphanumeric>`.
///
/// A `FileId` can only be obtained through [`FileId::generate`] or [`FileId::parse`], so
/// holding one means the shape has already been checked and a storage lookup is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..FILE_ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();
        let millis = now.timestamp_millis().max(0);
        Self(format!("{FILE_ID_PREFIX}{millis}_{suffix}"))
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidFileId> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InvalidFileId)
        }
    }

    /// Shape check only; says nothing about whether the file exists.
    pub fn is_valid(raw: &str) -> bool {
        if raw.is_empty() || raw == "undefined" || raw == "null" {
            return false;
        }
        let Some(rest) = raw.strip_prefix(FILE_ID_PREFIX) else {
            return false;
        };
        let Some((millis, suffix)) = rest.split_once('_') else {
            return false;
        };
        !millis.is_empty()
            && millis.bytes().all(|b| b.is_ascii_digit())
            && !suffix.is_empty()
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = InvalidFileId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = InvalidFileId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidFileId)
        }
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}
