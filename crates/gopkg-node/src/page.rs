//! HTML pages served for package paths.

use crate::docindex::PackageInfo;
use askama::Template;
use gopkg_types::{RepoIdentity, Site, Version, VersionList, UNSTABLE_SUFFIX};

/// Document read by `go get` when called with `?go-get=1`.
#[derive(Template)]
#[template(path = "go_get.html")]
pub struct GoGetTemplate {
    pub import_root: String,
    pub import_path: String,
    pub upstream_root: String,
    pub tree: String,
}

/// One entry in the versions sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLink {
    /// `vN` or `vN-unstable`.
    pub label: String,
    /// Protocol-relative import path for that major.
    pub href: String,
    /// Concrete version the label resolves to.
    pub version: String,
    /// True for the major the page was requested with.
    pub current: bool,
}

/// Human-readable landing page.
#[derive(Template)]
#[template(path = "package.html")]
pub struct PackageTemplate {
    pub title: String,
    pub import_path: String,
    pub public_host: String,
    pub source_url: String,
    pub docs_url: Option<String>,
    pub unstable: bool,
    pub package_name: Option<String>,
    pub synopsis: Option<String>,
    pub versions: Vec<VersionLink>,
}

/// Renders the `go-get=1` document.
///
/// Import strings use the coordinates the client asked for, so `go get`
/// keeps talking to this service even for redirected repositories. Source
/// links point at the upstream tree actually served.
pub fn render_go_get(site: &Site, repo: &RepoIdentity) -> Result<String, askama::Error> {
    let orig = repo.original();
    GoGetTemplate {
        import_root: site.import_root(&orig),
        import_path: site.import_path(&orig),
        upstream_root: site.upstream_root(repo),
        tree: repo.upstream_tree(),
    }
    .render()
}

/// Latest stable version of each major, highest first, with the resolved
/// version in front when an unstable major was requested.
pub fn latest_versions(repo: &RepoIdentity, versions: &VersionList) -> Vec<Version> {
    let mut latest = versions.latest_per_major();
    if repo.requested.unstable {
        if let Some(resolved) = repo.resolved {
            latest.insert(0, resolved);
        }
    }
    latest
}

fn version_links(site: &Site, repo: &RepoIdentity, latest: &[Version]) -> Vec<VersionLink> {
    if latest.is_empty() {
        return vec![VersionLink {
            label: "v0".to_string(),
            href: format!("//{}", site.import_path(repo)),
            version: "master".to_string(),
            current: true,
        }];
    }

    latest
        .iter()
        .map(|v| {
            let suffix = if v.unstable { UNSTABLE_SUFFIX } else { "" };
            VersionLink {
                label: format!("v{}{}", v.major, suffix),
                href: format!("//{}{}", site.version_root(repo, v), repo.subpath),
                version: v.to_string(),
                current: v.major == repo.requested.major && v.unstable == repo.requested.unstable,
            }
        })
        .collect()
}

/// Renders the landing page for a resolved package.
///
/// `docs_base` is the documentation site prefix; the import path is
/// appended to it.
pub fn render_package_page(
    site: &Site,
    repo: &RepoIdentity,
    versions: &VersionList,
    info: &PackageInfo,
    docs_base: Option<&str>,
) -> Result<String, askama::Error> {
    let orig = repo.original();
    let import_path = site.import_path(&orig);
    let latest = latest_versions(repo, versions);

    PackageTemplate {
        title: format!("{}.{}{}", orig.name, orig.requested, orig.subpath),
        source_url: format!(
            "https://{}/tree/{}{}",
            site.upstream_root(repo),
            repo.upstream_tree(),
            repo.subpath
        ),
        docs_url: docs_base.map(|base| format!("{}{}", base, import_path)),
        import_path,
        public_host: site.public_host.clone(),
        unstable: repo.requested.unstable,
        package_name: info.package_name.clone(),
        synopsis: info.synopsis.clone(),
        versions: version_links(site, &orig, &latest),
    }
    .render()
}
