//! The `Version` triple and its ordering and compatibility rules.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A `major.minor[.patch]` platform version.
///
/// Equality and ordering only look at the numeric components; the original
/// text is kept for display in logs.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    original: String,
}

/// Error returned when a string is not a dotted version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version format: {0:?}")]
pub struct ParseVersionError(pub String);

impl Version {
    /// Create a version from its numeric components.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        let original = if patch > 0 {
            format!("{major}.{minor}.{patch}")
        } else {
            format!("{major}.{minor}")
        };
        Self {
            major,
            minor,
            patch,
            original,
        }
    }

    /// The text this version was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Whether `self` and `other` share a major version and differ by at
    /// most two minor versions.
    pub fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major && self.minor.abs_diff(other.minor) <= 2
    }

    /// Distance between two versions, weighting major over minor over patch.
    pub fn distance_to(&self, other: &Version) -> i64 {
        if self.major != other.major {
            return i64::from(self.major.abs_diff(other.major)) * 10_000;
        }
        if self.minor != other.minor {
            return i64::from(self.minor.abs_diff(other.minor)) * 100;
        }
        i64::from(self.patch.abs_diff(other.patch))
    }

    /// Ranking score against `target`; lower is better.
    ///
    /// Candidates newer than the target subtract from their own score, so
    /// the score is not symmetric and can be negative.
    pub fn priority_score(&self, target: &Version) -> i64 {
        let age_penalty = (i64::from(target.minor) - i64::from(self.minor)) * 10;
        self.distance_to(target) - age_penalty
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    /// Parse `X.Y` or `X.Y.Z`; components past the third are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() < 2 {
            return Err(ParseVersionError(s.to_string()));
        }

        let component = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| ParseVersionError(s.to_string()))
        };

        Ok(Self {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: match parts.get(2) {
                Some(part) => component(part)?,
                None => 0,
            },
            original: trimmed.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch > 0 {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch).hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
