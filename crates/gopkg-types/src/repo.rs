//! Repository identities and the coordinates derived from them.

use crate::version::Version;
use serde::{Deserialize, Serialize};

/// Organization and name of a repository, as written in an import path or
/// as found upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoBase {
    /// Owning user or organization. `None` selects the default organization.
    #[serde(default)]
    pub org: Option<String>,
    /// Repository name.
    pub name: String,
}

impl RepoBase {
    /// Creates a new base.
    pub fn new(org: Option<&str>, name: &str) -> Self {
        Self {
            org: org.map(str::to_string),
            name: name.to_string(),
        }
    }
}

/// Which of the two import path shapes a request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathFormat {
    /// `[org/]name.vN[/subpath]`
    Current,
    /// `[org/]vN/name[/subpath]`
    Legacy,
}

/// The repository and version a request refers to.
///
/// Built by the path matcher, possibly rewritten by the redirect table, and
/// completed with `resolved` once the upstream advertisement was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    /// Owning user or organization, if one was given.
    pub org: Option<String>,
    /// Repository name.
    pub name: String,
    /// Package path below the repository root, with its leading slash.
    pub subpath: String,
    /// The selector from the import path.
    pub requested: Version,
    /// The best matching upstream version, once known.
    pub resolved: Option<Version>,
    /// Path shape used by the request.
    pub format: PathFormat,
    /// The coordinates the client asked for before a redirect applied.
    pub redirected_from: Option<RepoBase>,
}

impl RepoIdentity {
    /// Returns true if the request used the legacy `vN/name` shape.
    pub fn is_legacy(&self) -> bool {
        self.format == PathFormat::Legacy
    }

    /// Organization and name this identity resolves against.
    pub fn base(&self) -> RepoBase {
        RepoBase {
            org: self.org.clone(),
            name: self.name.clone(),
        }
    }

    /// Returns the identity with the coordinates the client originally
    /// requested, keeping everything learned about the redirect target.
    pub fn original(&self) -> RepoIdentity {
        let mut orig = self.clone();
        if let Some(from) = &self.redirected_from {
            orig.org = from.org.clone();
            orig.name = from.name.clone();
        }
        orig
    }

    /// Upstream tree name for the resolved version.
    pub fn upstream_tree(&self) -> String {
        match &self.resolved {
            Some(v) => v.to_string(),
            None => "master".to_string(),
        }
    }
}

/// Host names and conventions used to turn identities into URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Host serving the import paths, e.g. `gopkg.in`.
    pub public_host: String,
    /// Host of the upstream git service, e.g. `github.com`.
    pub upstream_host: String,
    /// Organization prefix used when a path names no organization.
    pub default_org_prefix: String,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            public_host: "gopkg.in".to_string(),
            upstream_host: "github.com".to_string(),
            default_org_prefix: "go-".to_string(),
        }
    }
}

impl Site {
    /// Upstream repository root, without a scheme.
    ///
    /// `yaml.v2` maps to `github.com/go-yaml/yaml` and `user/pkg.v1` to
    /// `github.com/user/pkg`.
    pub fn upstream_root(&self, repo: &RepoIdentity) -> String {
        match &repo.org {
            Some(org) => format!("{}/{}/{}", self.upstream_host, org, repo.name),
            None => format!(
                "{}/{}{}/{}",
                self.upstream_host, self.default_org_prefix, repo.name, repo.name
            ),
        }
    }

    /// Import root for `version`, reduced to its major selector.
    pub fn version_root(&self, repo: &RepoIdentity, version: &Version) -> String {
        let v = version.major_selector();
        let org = repo
            .org
            .as_deref()
            .map(|o| format!("{o}/"))
            .unwrap_or_default();
        match repo.format {
            PathFormat::Legacy => format!("{}/{}{}/{}", self.public_host, org, v, repo.name),
            PathFormat::Current => format!("{}/{}{}.{}", self.public_host, org, repo.name, v),
        }
    }

    /// Import root for the requested version.
    pub fn import_root(&self, repo: &RepoIdentity) -> String {
        self.version_root(repo, &repo.requested)
    }

    /// Full import path, subpath included.
    pub fn import_path(&self, repo: &RepoIdentity) -> String {
        format!("{}{}", self.import_root(repo), repo.subpath)
    }
}
