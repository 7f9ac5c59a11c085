//! Reference advertisement scanning and rewriting.
//!
//! The upstream `info/refs` response lists every branch and tag. Clients
//! check out whatever `HEAD` and `refs/heads/master` point at, so both are
//! replaced with the reference that best satisfies the requested version.

use crate::pktline::{write_data, PktLine, PktLineCursor};
use crate::{GitError, Result};
use bytes::{Bytes, BytesMut};
use gopkg_types::{Version, VersionList};
use std::ops::Range;
use tracing::debug;

const HASH_LEN: usize = 40;
const PEEL_SUFFIX: &str = "^{}";
const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";
const MASTER: &str = "refs/heads/master";

/// One `<hash> <name>[\0<capabilities>]` line of an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefRecord<'a> {
    /// Hex object id.
    pub hash: &'a str,
    /// Reference name, e.g. `refs/tags/v1.2.0^{}`.
    pub name: &'a str,
    /// Capability list following the NUL byte, without the trailing newline.
    pub capabilities: Option<&'a str>,
}

impl<'a> RefRecord<'a> {
    /// Parses a pkt-line payload.
    ///
    /// Returns None for payloads that are not reference lines, such as the
    /// `# service=` banner.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        if payload.len() <= HASH_LEN
            || payload[HASH_LEN] != b' '
            || !payload[..HASH_LEN].iter().all(u8::is_ascii_hexdigit)
        {
            return None;
        }
        let hash = std::str::from_utf8(&payload[..HASH_LEN]).ok()?;

        let rest = &payload[HASH_LEN + 1..];
        let name_end = rest
            .iter()
            .position(|&b| b == b'\n' || b == 0)
            .unwrap_or(rest.len());
        let name = std::str::from_utf8(&rest[..name_end]).ok()?;

        let capabilities = match rest.get(name_end) {
            Some(0) => {
                let caps = &rest[name_end + 1..];
                let caps = caps.strip_suffix(b"\n").unwrap_or(caps);
                Some(std::str::from_utf8(caps).ok()?)
            }
            _ => None,
        };

        Some(Self {
            hash,
            name,
            capabilities,
        })
    }

    /// Returns the version carried by a `refs/heads/v*` or `refs/tags/v*`
    /// name. Peeled tag names report the version of the tag itself.
    pub fn version(&self) -> Option<Version> {
        let short = self
            .name
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.name.strip_prefix(TAGS_PREFIX))?;
        if !short.starts_with('v') {
            return None;
        }
        let short = short.strip_suffix(PEEL_SUFFIX).unwrap_or(short);
        Version::parse(short).ok()
    }

    /// Reference name with any peel marker removed.
    pub fn unpeeled_name(&self) -> &'a str {
        self.name.strip_suffix(PEEL_SUFFIX).unwrap_or(self.name)
    }

    /// Returns true if this is a branch.
    pub fn is_branch(&self) -> bool {
        self.name.starts_with(HEADS_PREFIX)
    }
}

/// The output of [`rewrite_advertisement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// The advertisement to send to the client.
    pub advertisement: Bytes,
    /// Every version found, in advertisement order, duplicates included.
    pub versions: VersionList,
    /// The version `HEAD` now points at. None when the input was passed
    /// through untouched.
    pub resolved: Option<Version>,
}

/// The reference chosen for `HEAD`.
#[derive(Debug, Clone, Copy)]
struct Winner<'a> {
    version: Version,
    hash: &'a str,
    name: &'a str,
    branch: bool,
}

/// What a scan of the advertisement found.
#[derive(Debug, Default)]
struct Scan<'a> {
    head: Option<(Range<usize>, Option<&'a str>)>,
    master: Option<Range<usize>>,
    winner: Option<Winner<'a>>,
    versions: Vec<Version>,
}

fn scan<'a>(data: &'a [u8], requested: &Version) -> Result<Scan<'a>> {
    let mut found = Scan::default();

    for frame in PktLineCursor::new(data) {
        let frame = frame?;
        let PktLine::Data(payload) = frame.line else {
            continue;
        };
        let Some(record) = RefRecord::parse(payload) else {
            continue;
        };

        match record.name {
            "HEAD" => found.head = Some((frame.span.clone(), record.capabilities)),
            MASTER => found.master = Some(frame.span.clone()),
            _ => {}
        }

        let Some(version) = record.version() else {
            continue;
        };
        found.versions.push(version);

        // Equal versions replace the current winner so a peeled tag line
        // overrides the tag object listed just before it.
        let better = found
            .winner
            .map_or(true, |w| !version.less(&w.version));
        if requested.contains(&version) && better {
            found.winner = Some(Winner {
                version,
                hash: record.hash,
                name: record.unpeeled_name(),
                branch: record.is_branch(),
            });
        }
    }

    Ok(found)
}

/// Rewrites `data` so that `HEAD` and `refs/heads/master` point at the best
/// reference accepted by `requested`.
///
/// A repository without any version references is served as is when `v0`
/// is requested.
pub fn rewrite_advertisement(data: &[u8], requested: &Version) -> Result<Rewritten> {
    let found = scan(data, requested)?;

    if found.versions.is_empty() && *requested == Version::major(0) {
        debug!("no version references, serving advertisement unchanged");
        return Ok(Rewritten {
            advertisement: Bytes::copy_from_slice(data),
            versions: VersionList::new(),
            resolved: None,
        });
    }

    let (Some((head_span, head_caps)), Some(winner)) = (found.head, found.winner) else {
        return Err(GitError::NoMatchingVersion {
            requested: *requested,
        });
    };

    let caps = head_caps
        .filter(|c| !c.is_empty())
        .map(|c| c.replace("symref=", "oldref="));

    let head_line = match (winner.branch, caps) {
        (true, None) => format!("{} HEAD\0symref=HEAD:{}\n", winner.hash, winner.name),
        (true, Some(caps)) => format!(
            "{} HEAD\0symref=HEAD:{} {}\n",
            winner.hash, winner.name, caps
        ),
        (false, None) => format!("{} HEAD\n", winner.hash),
        (false, Some(caps)) => format!("{} HEAD\0{}\n", winner.hash, caps),
    };
    let master_line = format!("{} {}\n", winner.hash, MASTER);

    let mut excised = vec![head_span.clone()];
    excised.extend(found.master);
    excised.sort_by_key(|span| span.start);

    let mut out = BytesMut::with_capacity(data.len() + 256);
    let mut copied = 0;
    for span in &excised {
        out.extend_from_slice(&data[copied..span.start]);
        copied = span.end;
        if *span == head_span {
            write_data(&mut out, head_line.as_bytes())?;
            write_data(&mut out, master_line.as_bytes())?;
        }
    }
    out.extend_from_slice(&data[copied..]);

    debug!(
        requested = %requested,
        resolved = %winner.version,
        reference = winner.name,
        "rewrote advertisement"
    );

    Ok(Rewritten {
        advertisement: out.freeze(),
        versions: VersionList::from(found.versions),
        resolved: Some(winner.version),
    })
}
