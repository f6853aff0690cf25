//! Debian version strings and dpkg ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref EPOCH_RE: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref UPSTREAM_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+~:-]*$").unwrap();
    static ref REVISION_RE: Regex = Regex::new(r"^[A-Za-z0-9.+~]+$").unwrap();
}

/// Error type for version parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version string is empty")]
    Empty,
    #[error("Invalid epoch in version \"{0}\"")]
    InvalidEpoch(String),
    #[error("Invalid upstream version in \"{0}\"")]
    InvalidUpstream(String),
    #[error("Invalid revision in version \"{0}\"")]
    InvalidRevision(String),
}

/// A parsed `[epoch:]upstream[-revision]` version.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u32,
    upstream: String,
    revision: String,
}

impl Version {
    /// Parse and validate a version string.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let (epoch, rest) = split_epoch(input);
        let epoch = match epoch {
            Some(e) if EPOCH_RE.is_match(e) => e
                .parse::<u32>()
                .map_err(|_| VersionError::InvalidEpoch(input.to_string()))?,
            Some(_) => return Err(VersionError::InvalidEpoch(input.to_string())),
            None => 0,
        };

        let (upstream, revision) = split_revision(rest);
        if !UPSTREAM_RE.is_match(upstream) {
            return Err(VersionError::InvalidUpstream(input.to_string()));
        }
        if let Some(rev) = revision {
            if !REVISION_RE.is_match(rev) {
                return Err(VersionError::InvalidRevision(input.to_string()));
            }
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.unwrap_or_default().to_string(),
        })
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        f.write_str(&self.upstream)?;
        if !self.revision.is_empty() {
            write!(f, "-{}", self.revision)?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(self.upstream.as_bytes(), other.upstream.as_bytes()))
            .then_with(|| verrevcmp(self.revision.as_bytes(), other.revision.as_bytes()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings with dpkg semantics.
///
/// Unlike [`Version::parse`] this never fails: malformed input is compared
/// on a best-effort basis, the way package managers treat archive data.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (epoch_a, rest_a) = split_epoch(a);
    let (epoch_b, rest_b) = split_epoch(b);
    let epoch_a = epoch_a.and_then(|e| e.parse::<u64>().ok()).unwrap_or(0);
    let epoch_b = epoch_b.and_then(|e| e.parse::<u64>().ok()).unwrap_or(0);
    if epoch_a != epoch_b {
        return epoch_a.cmp(&epoch_b);
    }

    let (up_a, rev_a) = split_revision(rest_a);
    let (up_b, rev_b) = split_revision(rest_b);
    verrevcmp(up_a.as_bytes(), up_b.as_bytes()).then_with(|| {
        verrevcmp(
            rev_a.unwrap_or_default().as_bytes(),
            rev_b.unwrap_or_default().as_bytes(),
        )
    })
}

fn split_epoch(input: &str) -> (Option<&str>, &str) {
    match input.find(':') {
        Some(pos) => (Some(&input[..pos]), &input[pos + 1..]),
        None => (None, input),
    }
}

fn split_revision(input: &str) -> (&str, Option<&str>) {
    match input.rfind('-') {
        Some(pos) => (&input[..pos], Some(&input[pos + 1..])),
        None => (input, None),
    }
}

/// Sort weight of a character in the non-digit part of a version.
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

fn verrevcmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0usize, 0usize);
    let digit = |s: &[u8], k: usize| s.get(k).is_some_and(|c| c.is_ascii_digit());

    while i < a.len() || j < b.len() {
        while (i < a.len() && !digit(a, i)) || (j < b.len() && !digit(b, j)) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while digit(a, i) && digit(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if digit(a, i) {
            return Ordering::Greater;
        }
        if digit(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v = Version::parse("2:1.4.3-2ubuntu1").unwrap();
        assert_eq!(v.epoch(), 2);
        assert_eq!(v.upstream(), "1.4.3");
        assert_eq!(v.revision(), "2ubuntu1");
        assert_eq!(v.to_string(), "2:1.4.3-2ubuntu1");
    }

    #[test]
    fn test_parse_hyphenated_upstream() {
        let v = Version::parse("1.0-beta-3").unwrap();
        assert_eq!(v.upstream(), "1.0-beta");
        assert_eq!(v.revision(), "3");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(Version::parse(""), Err(VersionError::Empty)));
        assert!(matches!(Version::parse("a:1.0"), Err(VersionError::InvalidEpoch(_))));
        assert!(matches!(Version::parse("1.0_1"), Err(VersionError::InvalidUpstream(_))));
        assert!(matches!(Version::parse("1.0-r_1"), Err(VersionError::InvalidRevision(_))));
    }

    #[test]
    fn test_compare_numeric_parts() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.01", "1.1"), Ordering::Equal);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_compare_tilde_sorts_first() {
        assert_eq!(compare_versions("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(compare_versions("1.0~rc1", "1.0~beta"), Ordering::Greater);
    }

    #[test]
    fn test_compare_letters_before_symbols() {
        assert_eq!(compare_versions("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(compare_versions("1.0+", "1.0."), Ordering::Less);
    }

    #[test]
    fn test_compare_epoch_wins() {
        assert_eq!(compare_versions("1:0.1", "9.9"), Ordering::Greater);
        assert_eq!(compare_versions("0:1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_compare_revision() {
        assert_eq!(compare_versions("1.0-1", "1.0-2"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0-0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0-1ubuntu1", "1.0-1"), Ordering::Greater);
    }

    #[test]
    fn test_version_ord_matches_string_compare() {
        let mut versions: Vec<Version> = ["1.0-1", "1:0.5", "1.0~rc1-1", "0.9"]
            .iter()
            .map(|s| Version::parse(s).unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, vec!["0.9", "1.0~rc1-1", "1.0-1", "1:0.5"]);
    }
}
