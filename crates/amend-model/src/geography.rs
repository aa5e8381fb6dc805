// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Census block-group GEOID: state(2) + county(3) + tract(6) + block group(1).
pub const BLOCK_GROUP_ID_LEN: usize = 12;
pub const UNIT_NAME_MAX_LEN: usize = 128;

/// Aggregation level of a geographic unit. Block groups are atomic;
/// municipality and watershed values are derived from block-group rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum GeoLevel {
    BlockGroup,
    Municipality,
    Watershed,
}

impl GeoLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockGroup => "block_group",
            Self::Municipality => "municipality",
            Self::Watershed => "watershed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "block_group" => Ok(Self::BlockGroup),
            "municipality" => Ok(Self::Municipality),
            "watershed" => Ok(Self::Watershed),
            other => Err(ValidationError(format!(
                "unknown geography level: {other} (expected block_group, municipality, watershed)"
            ))),
        }
    }
}

impl Display for GeoLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct BlockGroupId(String);

impl BlockGroupId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("block group id must not be empty".to_string()));
        }
        if s.len() != BLOCK_GROUP_ID_LEN {
            return Err(ValidationError(format!(
                "block group id must be a {BLOCK_GROUP_ID_LEN}-digit GEOID, got {:?}",
                s
            )));
        }
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError(format!(
                "block group id must be numeric, got {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for BlockGroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn parse_block_group_id(input: &str) -> Result<BlockGroupId, ValidationError> {
    BlockGroupId::parse(input)
}

/// Identifier of a geographic unit at any level: a GEOID for block groups,
/// a canonical name for municipalities and watersheds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct GeoUnitId(String);

impl GeoUnitId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("geo unit id must not be empty".to_string()));
        }
        if s.len() > UNIT_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "geo unit id exceeds max length {UNIT_NAME_MAX_LEN}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GeoUnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BlockGroupId> for GeoUnitId {
    fn from(id: BlockGroupId) -> Self {
        Self(id.into_inner())
    }
}
