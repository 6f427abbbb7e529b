//! Data-version token
//!
//! A `VersionCorrection` identifies a consistent snapshot of versioned master
//! data: the version instant ("as of") and the correction instant ("corrected
//! to"). Either end may be left open, meaning LATEST.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

const LATEST: &str = "LATEST";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version-correction '{input}': {reason}")]
pub struct VersionCorrectionParseError {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VersionCorrection {
    pub version_as_of: Option<DateTime<Utc>>,
    pub corrected_to: Option<DateTime<Utc>>,
}

impl VersionCorrection {
    /// Both ends open
    pub const LATEST: VersionCorrection = VersionCorrection {
        version_as_of: None,
        corrected_to: None,
    };

    pub fn of(version_as_of: Option<DateTime<Utc>>, corrected_to: Option<DateTime<Utc>>) -> Self {
        Self {
            version_as_of,
            corrected_to,
        }
    }

    pub fn of_version_as_of(version_as_of: DateTime<Utc>) -> Self {
        Self::of(Some(version_as_of), None)
    }

    pub fn of_corrected_to(corrected_to: DateTime<Utc>) -> Self {
        Self::of(None, Some(corrected_to))
    }

    pub fn with_version_as_of(self, version_as_of: Option<DateTime<Utc>>) -> Self {
        Self {
            version_as_of,
            ..self
        }
    }

    pub fn with_corrected_to(self, corrected_to: Option<DateTime<Utc>>) -> Self {
        Self {
            corrected_to,
            ..self
        }
    }

    /// True if either end is LATEST
    pub fn contains_latest(&self) -> bool {
        self.version_as_of.is_none() || self.corrected_to.is_none()
    }

    /// Pin open ends to `now`
    pub fn with_latest_fixed(self, now: DateTime<Utc>) -> Self {
        Self {
            version_as_of: Some(self.version_as_of.unwrap_or(now)),
            corrected_to: Some(self.corrected_to.unwrap_or(now)),
        }
    }

    pub fn version_as_of_string(&self) -> String {
        format_instant(self.version_as_of)
    }

    pub fn corrected_to_string(&self) -> String {
        format_instant(self.corrected_to)
    }

    /// Parse the canonical `V<as-of>.C<corrected-to>` form
    pub fn parse(input: &str) -> Result<Self, VersionCorrectionParseError> {
        let fail = |reason: &str| VersionCorrectionParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let rest = input
            .strip_prefix('V')
            .ok_or_else(|| fail("must start with 'V'"))?;
        let (version, corrected) = rest
            .split_once(".C")
            .ok_or_else(|| fail("missing '.C' separator"))?;

        Ok(Self::of(
            parse_instant(version).map_err(|e| fail(&e))?,
            parse_instant(corrected).map_err(|e| fail(&e))?,
        ))
    }
}

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    match instant {
        Some(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => LATEST.to_string(),
    }
}

fn parse_instant(text: &str) -> Result<Option<DateTime<Utc>>, String> {
    if text == LATEST {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|at| Some(at.with_timezone(&Utc)))
        .map_err(|e| e.to_string())
}

/// LATEST sorts after every fixed instant
fn cmp_latest_last(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for VersionCorrection {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_latest_last(&self.version_as_of, &other.version_as_of)
            .then_with(|| cmp_latest_last(&self.corrected_to, &other.corrected_to))
    }
}

impl PartialOrd for VersionCorrection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "V{}.C{}",
            self.version_as_of_string(),
            self.corrected_to_string()
        )
    }
}

impl std::str::FromStr for VersionCorrection {
    type Err = VersionCorrectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
