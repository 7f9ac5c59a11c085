//! Import path matching.
//!
//! Two path shapes are recognised:
//!
//! ```text
//! /[org/]name.vN[.git][/subpath]     current
//! /[org/]vN/name[.git][/subpath]     legacy
//! ```
//!
//! The current shape is tried first. Names may contain dots, so in
//! `/pkg.v1.v2` the longest name that still leaves a valid selector wins
//! (`name = pkg.v1`, selector `v2`).
//!
//! Selectors are recognised loosely (`v` followed by dot-separated digits)
//! so that a path such as `/pkg.v1.2` is reported as carrying too many
//! version components instead of falling through as an unknown URL.

use crate::error::SelectorError;
use crate::repo::{PathFormat, RepoIdentity};
use crate::version::{Version, UNSTABLE_SUFFIX};

/// Result of matching a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The path names a versioned package.
    Package(RepoIdentity),
    /// The path is not a package path; someone else should serve it.
    NotPackagePath,
}

/// Raw pieces of a matched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Captures<'a> {
    org: Option<&'a str>,
    name: &'a str,
    selector: &'a str,
    subpath: &'a str,
}

/// A successful syntactic match, tagged with the shape that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathMatch<'a> {
    Current(Captures<'a>),
    Legacy(Captures<'a>),
}

impl<'a> PathMatch<'a> {
    fn find(path: &'a str) -> Option<Self> {
        match_current(path)
            .map(PathMatch::Current)
            .or_else(|| match_legacy(path).map(PathMatch::Legacy))
    }

    fn into_parts(self) -> (Captures<'a>, PathFormat) {
        match self {
            PathMatch::Current(c) => (c, PathFormat::Current),
            PathMatch::Legacy(c) => (c, PathFormat::Legacy),
        }
    }
}

/// Matches a request path against the supported import path shapes.
///
/// Returns [`MatchOutcome::NotPackagePath`] when neither shape matches; that
/// is not an error. A path that matches but carries an unusable selector is
/// reported as a [`SelectorError`].
pub fn match_path(path: &str) -> Result<MatchOutcome, SelectorError> {
    let Some(found) = PathMatch::find(path) else {
        return Ok(MatchOutcome::NotPackagePath);
    };
    let (caps, format) = found.into_parts();
    let requested = parse_selector(caps.selector)?;

    Ok(MatchOutcome::Package(RepoIdentity {
        org: caps.org.map(str::to_string),
        name: caps.name.to_string(),
        subpath: caps.subpath.to_string(),
        requested,
        resolved: None,
        format,
        redirected_from: None,
    }))
}

/// Turns a syntactically matched selector into a major-only version.
fn parse_selector(selector: &str) -> Result<Version, SelectorError> {
    let (numbers, unstable) = match selector.strip_suffix(UNSTABLE_SUFFIX) {
        Some(rest) => (rest, true),
        None => (selector, false),
    };
    if let Some((major, _)) = numbers.split_once('.') {
        let suffix = if unstable { UNSTABLE_SUFFIX } else { "" };
        return Err(SelectorError::ComponentCount {
            selector: selector.to_string(),
            major: format!("{major}{suffix}"),
        });
    }
    Version::parse(selector).map_err(|source| SelectorError::NotAVersion {
        selector: selector.to_string(),
        source,
    })
}

fn match_current(path: &str) -> Option<Captures<'_>> {
    let rest = path.strip_prefix('/')?;
    if let Some((org, after)) = rest.split_once('/') {
        if is_org(org, |b| b.is_ascii_alphanumeric()) {
            if let Some(caps) = match_name_selector(after) {
                return Some(Captures {
                    org: Some(org),
                    ..caps
                });
            }
        }
    }
    match_name_selector(rest)
}

/// Matches `name.vN[.git][/subpath]`.
fn match_name_selector(s: &str) -> Option<Captures<'_>> {
    let (segment, subpath) = split_segment(s);
    if !is_subpath(subpath, is_current_subpath_component) {
        return None;
    }
    for (dot, _) in segment.rmatch_indices('.') {
        let name = &segment[..dot];
        if !is_current_name(name) {
            continue;
        }
        let tail = &segment[dot + 1..];
        let selector = if is_selector(tail) {
            Some(tail)
        } else {
            tail.strip_suffix(".git").filter(|s| is_selector(s))
        };
        if let Some(selector) = selector {
            return Some(Captures {
                org: None,
                name,
                selector,
                subpath,
            });
        }
    }
    None
}

fn match_legacy(path: &str) -> Option<Captures<'_>> {
    let rest = path.strip_prefix('/')?;
    if let Some((org, after)) = rest.split_once('/') {
        if is_org(org, |b| b.is_ascii_lowercase() || b.is_ascii_digit()) {
            if let Some(caps) = match_selector_name(after) {
                return Some(Captures {
                    org: Some(org),
                    ..caps
                });
            }
        }
    }
    match_selector_name(rest)
}

/// Matches `vN/name[.git][/subpath]`.
fn match_selector_name(s: &str) -> Option<Captures<'_>> {
    let (selector, after) = s.split_once('/')?;
    if !is_selector(selector) {
        return None;
    }
    let (segment, subpath) = split_segment(after);
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if !is_legacy_name(name) || !is_subpath(subpath, is_legacy_name) {
        return None;
    }
    Some(Captures {
        org: None,
        name,
        selector,
        subpath,
    })
}

/// Splits at the first slash, keeping the slash with the remainder.
fn split_segment(s: &str) -> (&str, &str) {
    match s.find('/') {
        Some(i) => s.split_at(i),
        None => (s, ""),
    }
}

/// `v` followed by dot-separated digit runs and an optional unstable suffix.
fn is_selector(s: &str) -> bool {
    let Some(body) = s.strip_prefix('v') else {
        return false;
    };
    let body = body.strip_suffix(UNSTABLE_SUFFIX).unwrap_or(body);
    body.split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// First byte accepted by `first`, at least one more byte from `first` or `-`.
fn is_org(s: &str, first: impl Fn(u8) -> bool) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && first(bytes[0]) && bytes[1..].iter().all(|&b| first(b) || b == b'-')
}

fn is_current_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

fn is_legacy_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_current_subpath_component(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes[0].is_ascii_alphanumeric()
        && bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

/// Empty, or a sequence of `/component`.
fn is_subpath(s: &str, component: impl Fn(&str) -> bool) -> bool {
    if s.is_empty() {
        return true;
    }
    match s.strip_prefix('/') {
        Some(rest) => rest.split('/').all(component),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VersionError;
    use proptest::prelude::*;

    fn package(path: &str) -> RepoIdentity {
        match match_path(path) {
            Ok(MatchOutcome::Package(repo)) => repo,
            other => panic!("{path:?} should match a package, got {other:?}"),
        }
    }

    fn parts(path: &str) -> (Option<String>, String, String, String) {
        let repo = package(path);
        (
            repo.org,
            repo.name,
            repo.requested.to_string(),
            repo.subpath,
        )
    }

    fn owned(org: Option<&str>, name: &str, v: &str, sub: &str) -> (Option<String>, String, String, String) {
        (
            org.map(str::to_string),
            name.to_string(),
            v.to_string(),
            sub.to_string(),
        )
    }

    #[test]
    fn test_current_format() {
        assert_eq!(parts("/pkg.v3"), owned(None, "pkg", "v3", ""));
        assert_eq!(parts("/user/pkg.v3"), owned(Some("user"), "pkg", "v3", ""));
        assert_eq!(parts("/pkg.v3/sub/pkg"), owned(None, "pkg", "v3", "/sub/pkg"));
        assert_eq!(
            parts("/user/pkg.v3/subpkg"),
            owned(Some("user"), "pkg", "v3", "/subpkg")
        );
        assert_eq!(parts("/pkg.v0"), owned(None, "pkg", "v0", ""));
        assert_eq!(package("/pkg.v3").format, PathFormat::Current);
    }

    #[test]
    fn test_current_format_git_suffix_is_stripped() {
        assert_eq!(
            parts("/yaml.v2.git/info/refs"),
            owned(None, "yaml", "v2", "/info/refs")
        );
        assert_eq!(
            parts("/user/pkg.v1.git/git-upload-pack"),
            owned(Some("user"), "pkg", "v1", "/git-upload-pack")
        );
    }

    #[test]
    fn test_current_format_unstable() {
        let repo = package("/pkg.v2-unstable/sub");
        assert_eq!(repo.requested, Version::major(2).into_unstable());
        assert_eq!(repo.subpath, "/sub");
    }

    #[test]
    fn test_longest_name_wins() {
        assert_eq!(parts("/go.uber.v1"), owned(None, "go.uber", "v1", ""));
        assert_eq!(parts("/pkg.v1.v2"), owned(None, "pkg.v1", "v2", ""));
        assert_eq!(
            parts("/user/my-pkg.io.v4/x.y"),
            owned(Some("user"), "my-pkg.io", "v4", "/x.y")
        );
    }

    #[test]
    fn test_dotted_selector_binds_to_shortest_suffix() {
        // `pkg.v1.2` is name `pkg` with selector `v1.2`, not name `pkg.v1`.
        match match_path("/pkg.v1.2") {
            Err(SelectorError::ComponentCount { selector, major }) => {
                assert_eq!(selector, "v1.2");
                assert_eq!(major, "v1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_too_many_components_rejected() {
        for path in ["/pkg.v1.2.3", "/pkg.v1.2.3.4", "/user/pkg.v1.0/sub", "/v1.2/pkg"] {
            assert!(
                matches!(match_path(path), Err(SelectorError::ComponentCount { .. })),
                "{path}"
            );
        }
        match match_path("/pkg.v3.1-unstable") {
            Err(SelectorError::ComponentCount { major, .. }) => assert_eq!(major, "v3-unstable"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_not_a_version_rejected() {
        match match_path("/pkg.v01") {
            Err(SelectorError::NotAVersion { selector, source }) => {
                assert_eq!(selector, "v01");
                assert!(matches!(source, VersionError::Syntax { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        match match_path("/pkg.v99999999999") {
            Err(SelectorError::NotAVersion { source, .. }) => {
                assert!(matches!(source, VersionError::OutOfRange { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let count = match_path("/pkg.v1.2").unwrap_err();
        let invalid = match_path("/pkg.v007").unwrap_err();
        assert!(count.to_string().contains("major version only"));
        assert!(invalid.to_string().contains("not a valid version"));
    }

    #[test]
    fn test_legacy_format() {
        assert_eq!(parts("/v2/yaml"), owned(None, "yaml", "v2", ""));
        assert_eq!(
            parts("/user/v1/pkg/sub"),
            owned(Some("user"), "pkg", "v1", "/sub")
        );
        assert_eq!(
            parts("/v1/pkg.git/info/refs"),
            owned(None, "pkg", "v1", "/info/refs")
        );
        assert_eq!(package("/v2/yaml").format, PathFormat::Legacy);
    }

    #[test]
    fn test_legacy_org_must_be_lowercase() {
        assert_eq!(match_path("/User/v1/pkg"), Ok(MatchOutcome::NotPackagePath));
    }

    #[test]
    fn test_legacy_selector_looking_org() {
        // "v1" is a valid legacy org too; the org-less reading must still apply.
        assert_eq!(parts("/v1/pkg"), owned(None, "pkg", "v1", ""));
    }

    #[test]
    fn test_not_package_paths() {
        for path in [
            "",
            "/",
            "/a",
            "/a/b",
            "/a/b/pkg.v3",
            "/pkg",
            "/pkg.v",
            "/pkg.vx",
            "/pkg.v1/",
            "/pkg.v1//sub",
            "/1pkg.v1",
            "/.v1",
            "pkg.v1",
            "/health-check",
            "/pkg.v1/_sub",
        ] {
            assert_eq!(match_path(path), Ok(MatchOutcome::NotPackagePath), "{path:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_match_never_panics(path in "/[-./a-zA-Z0-9]{0,40}") {
            let _ = match_path(&path);
        }

        #[test]
        fn prop_simple_paths_match(
            org in proptest::option::of("[a-z0-9][-a-z0-9]{1,10}"),
            name in "[a-zA-Z][-a-zA-Z0-9]{0,10}",
            major in 0u32..10_000,
        ) {
            let prefix = org.as_deref().map(|o| format!("/{o}")).unwrap_or_default();
            let repo = package(&format!("{prefix}/{name}.v{major}/sub"));
            prop_assert_eq!(repo.org, org);
            prop_assert_eq!(repo.name, name);
            prop_assert_eq!(repo.requested, Version::major(major));
            prop_assert_eq!(repo.subpath, "/sub");
        }
    }
}
