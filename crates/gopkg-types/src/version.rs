//! Version selectors.
//!
//! A selector looks like `v1`, `v1.2` or `v1.2.3`, optionally followed by the
//! unstable channel suffix (`v1-unstable`). Components that were not written
//! are kept absent rather than defaulted, so `v1` and `v1.0` are different
//! values: the former selects a whole major line, the latter one minor line.

use crate::error::VersionError;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Suffix marking the unstable channel of a major version.
pub const UNSTABLE_SUFFIX: &str = "-unstable";

/// A parsed version selector or reference version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version, always present.
    pub major: u32,
    /// Minor version, when written.
    pub minor: Option<u32>,
    /// Patch version, when written. Never present without `minor`.
    pub patch: Option<u32>,
    /// Whether this belongs to the unstable channel.
    pub unstable: bool,
}

impl Version {
    /// Creates a bare major selector (`vN`).
    pub const fn major(major: u32) -> Self {
        Self {
            major,
            minor: None,
            patch: None,
            unstable: false,
        }
    }

    /// Creates a fully specified version (`vN.N.N`).
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: Some(patch),
            unstable: false,
        }
    }

    /// Returns the same version on the unstable channel.
    pub const fn into_unstable(mut self) -> Self {
        self.unstable = true;
        self
    }

    /// Parses a selector such as `v1`, `v1.2`, `v1.2.3` or `v2-unstable`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let body = s
            .strip_prefix('v')
            .ok_or_else(|| VersionError::syntax(s, "missing leading 'v'"))?;
        let (body, unstable) = match body.strip_suffix(UNSTABLE_SUFFIX) {
            Some(rest) => (rest, true),
            None => (body, false),
        };

        let mut parts = [None; 3];
        for (count, part) in body.split('.').enumerate() {
            if count == parts.len() {
                return Err(VersionError::syntax(s, "more than three components"));
            }
            parts[count] = Some(parse_component(s, part)?);
        }

        let major = parts[0].ok_or_else(|| VersionError::syntax(s, "empty component"))?;
        Ok(Self {
            major,
            minor: parts[1],
            patch: parts[2],
            unstable,
        })
    }

    /// Returns the bare major selector this version belongs to.
    ///
    /// The unstable flag is kept, so `v1.2-unstable` maps to `v1-unstable`.
    pub fn major_selector(&self) -> Self {
        Self {
            major: self.major,
            minor: None,
            patch: None,
            unstable: self.unstable,
        }
    }

    /// Returns true if `self < other` under the selection order.
    pub fn less(&self, other: &Self) -> bool {
        self < other
    }

    /// Reports whether this selector accepts `candidate`.
    ///
    /// `v1` accepts every `v1.x.y`, `v1.2` accepts every `v1.2.y`, and a fully
    /// specified selector accepts only itself. The unstable flag must match
    /// on both sides.
    pub fn contains(&self, candidate: &Self) -> bool {
        if self.unstable != candidate.unstable {
            return false;
        }
        if self.patch.is_some() {
            return self == candidate;
        }
        if self.minor.is_some() {
            return self.major == candidate.major && self.minor == candidate.minor;
        }
        self.major == candidate.major
    }
}

fn parse_component(full: &str, part: &str) -> Result<u32, VersionError> {
    if part.is_empty() {
        return Err(VersionError::syntax(full, "empty component"));
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::syntax(full, "non-digit in component"));
    }
    if part.len() > 1 && part.starts_with('0') {
        return Err(VersionError::syntax(full, "leading zero"));
    }
    part.bytes()
        .try_fold(0u32, |acc, b| {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        })
        .ok_or_else(|| VersionError::OutOfRange {
            input: full.to_string(),
        })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            // Unstable sorts before an otherwise equal stable version.
            .then(other.unstable.cmp(&self.unstable))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        if self.unstable {
            f.write_str(UNSTABLE_SUFFIX)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A list of versions discovered in a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionList(pub Vec<Version>);

impl VersionList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no versions were discovered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of versions, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the versions in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Version> {
        self.0.iter()
    }

    /// Returns the versions sorted ascending.
    pub fn sorted(&self) -> Vec<Version> {
        let mut versions = self.0.clone();
        versions.sort();
        versions
    }

    /// Returns the latest stable version of each major, highest major first.
    pub fn latest_per_major(&self) -> Vec<Version> {
        let mut latest: Vec<Version> = Vec::new();
        for v in self.0.iter().filter(|v| !v.unstable) {
            match latest.iter_mut().find(|l| l.major == v.major) {
                Some(existing) if *existing < *v => *existing = *v,
                Some(_) => {}
                None => latest.push(*v),
            }
        }
        latest.sort_by(|a, b| b.cmp(a));
        latest
    }
}

impl From<Vec<Version>> for VersionList {
    fn from(versions: Vec<Version>) -> Self {
        Self(versions)
    }
}

impl<'a> IntoIterator for &'a VersionList {
    type Item = &'a Version;
    type IntoIter = std::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(v("v0"), Version::major(0));
        assert_eq!(v("v1"), Version::major(1));
        assert_eq!(
            v("v1.2"),
            Version {
                major: 1,
                minor: Some(2),
                patch: None,
                unstable: false
            }
        );
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("v12.34.56"), Version::new(12, 34, 56));
        assert_eq!(v("v2-unstable"), Version::major(2).into_unstable());
        assert_eq!(v("v1.0.0-unstable"), Version::new(1, 0, 0).into_unstable());
    }

    #[test]
    fn test_parse_invalid() {
        let invalid = [
            "", "v", "v-1", "v01", "v1.01", "a1", "1", "v1a", "v1..2", "v1.2.3.4", "v1.", "v1.2.",
            "v1.2.3.", "V1", "v1-unstable-unstable", "v1-beta", "v+1", "v 1", "v1.-2",
        ];
        for s in invalid {
            match Version::parse(s) {
                Err(VersionError::Syntax { .. }) => {}
                other => panic!("{s:?} should be a syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_out_of_range() {
        let err = Version::parse("v4294967296").unwrap_err();
        assert!(matches!(err, VersionError::OutOfRange { .. }));

        let err = Version::parse("v1.99999999999999999999").unwrap_err();
        assert!(matches!(err, VersionError::OutOfRange { .. }));

        assert_eq!(v("v4294967295").major, u32::MAX);
    }

    #[test]
    fn test_display_only_present_components() {
        assert_eq!(Version::major(3).to_string(), "v3");
        assert_eq!(v("v3.1").to_string(), "v3.1");
        assert_eq!(Version::new(3, 1, 4).to_string(), "v3.1.4");
        assert_eq!(v("v3.1-unstable").to_string(), "v3.1-unstable");
    }

    #[test]
    fn test_less() {
        let cases = [
            ("v0.0.0", "v0.0.0", false),
            ("v1.0.0", "v1.0.0", false),
            ("v1.0.0", "v1.1.0", true),
            ("v1.0.0", "v2.0.0", true),
            ("v0.1.0", "v0.1.0", false),
            ("v0.1.0", "v0.1.1", true),
            ("v0.0.0", "v0.2.0", true),
            ("v0.0.1", "v0.0.1", false),
            ("v0.0.1", "v0.0.2", true),
            ("v2.0.0", "v1.9.9", false),
            ("v1", "v1.0", true),
            ("v1.3", "v1.3.0", true),
        ];
        for (a, b, want) in cases {
            assert_eq!(v(a).less(&v(b)), want, "{a} < {b}");
        }
    }

    #[test]
    fn test_unstable_sorts_before_stable() {
        assert!(v("v1.2-unstable").less(&v("v1.2")));
        assert!(!v("v1.2").less(&v("v1.2-unstable")));
        assert!(v("v1.2").less(&v("v1.3-unstable")));
    }

    #[test]
    fn test_contains() {
        let cases = [
            ("v12.34.56", "v12.34.56", true),
            ("v12.34.56", "v12.34.78", false),
            ("v12.34", "v12.34.56", true),
            ("v12.34", "v12.78.56", false),
            ("v12", "v12.34.56", true),
            ("v12", "v78.34.56", false),
            ("v12.34", "v12", false),
            ("v12.34.56", "v12.34", false),
            ("v1", "v1-unstable", false),
            ("v1-unstable", "v1", false),
            ("v1-unstable", "v1.3-unstable", true),
            ("v1", "v1.3-unstable", false),
        ];
        for (a, b, want) in cases {
            assert_eq!(v(a).contains(&v(b)), want, "{a}.contains({b})");
        }
    }

    #[test]
    fn test_major_selector() {
        assert_eq!(v("v1.2.3").major_selector(), v("v1"));
        assert_eq!(v("v1.2-unstable").major_selector(), v("v1-unstable"));
    }

    #[test]
    fn test_version_list_latest_per_major() {
        let list = VersionList::from(vec![
            v("v1.1"),
            v("v2.0.1"),
            v("v1.3"),
            v("v2.0.0"),
            v("v3-unstable"),
            v("v0"),
        ]);
        assert_eq!(list.latest_per_major(), vec![v("v2.0.1"), v("v1.3"), v("v0")]);
    }

    #[test]
    fn test_serialize_as_string() {
        let json = serde_json::to_string(&VersionList::from(vec![v("v1.2"), v("v2-unstable")]))
            .unwrap();
        assert_eq!(json, r#"["v1.2","v2-unstable"]"#);
    }

    fn version_strategy() -> impl Strategy<Value = Version> {
        (
            0u32..1000,
            proptest::option::of(0u32..1000),
            0u32..1000,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(major, minor, patch, with_patch, unstable)| Version {
                major,
                minor,
                patch: minor.and(with_patch.then_some(patch)),
                unstable,
            })
    }

    proptest! {
        #[test]
        fn prop_format_parse_roundtrip(version in version_strategy()) {
            let formatted = version.to_string();
            let parsed = Version::parse(&formatted).unwrap();
            prop_assert_eq!(parsed, version);
            prop_assert_eq!(parsed.to_string(), formatted);
        }

        #[test]
        fn prop_contains_self(version in version_strategy()) {
            prop_assert!(version.contains(&version));
        }

        #[test]
        fn prop_major_selector_contains_same_channel(version in version_strategy()) {
            prop_assert!(version.major_selector().contains(&version));
            let mut other_channel = version.major_selector();
            other_channel.unstable = !version.unstable;
            prop_assert!(!other_channel.contains(&version));
        }

        #[test]
        fn prop_parse_never_panics(s in "\\PC{0,24}") {
            let _ = Version::parse(&s);
        }
    }
}
