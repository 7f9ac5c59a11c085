//! Static remapping of renamed upstream repositories.

use crate::repo::{RepoBase, RepoIdentity};
use std::collections::HashMap;

/// Lookup table from requested coordinates to the upstream repository that
/// now serves them.
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    entries: HashMap<RepoBase, RepoBase>,
}

impl RedirectTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the redirects every deployment carries.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        // github.com/go-fsnotify/fsnotify moved to github.com/fsnotify/fsnotify.
        table.insert(
            RepoBase::new(None, "fsnotify"),
            RepoBase::new(Some("fsnotify"), "fsnotify"),
        );
        table
    }

    /// Adds or replaces a redirect.
    pub fn insert(&mut self, from: RepoBase, to: RepoBase) {
        self.entries.insert(from, to);
    }

    /// Looks up the replacement for `from`.
    pub fn get(&self, from: &RepoBase) -> Option<&RepoBase> {
        self.entries.get(from)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points `repo` at its replacement, remembering where it came from.
    ///
    /// Returns true if a redirect applied. Applying is not transitive: the
    /// replacement is never looked up again.
    pub fn apply(&self, repo: &mut RepoIdentity) -> bool {
        let Some(to) = self.entries.get(&repo.base()) else {
            return false;
        };
        repo.redirected_from = Some(repo.base());
        repo.org = to.org.clone();
        repo.name = to.name.clone();
        true
    }
}

impl FromIterator<(RepoBase, RepoBase)> for RedirectTable {
    fn from_iter<I: IntoIterator<Item = (RepoBase, RepoBase)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(RepoBase, RepoBase)> for RedirectTable {
    fn extend<I: IntoIterator<Item = (RepoBase, RepoBase)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::PathFormat;
    use crate::version::Version;

    fn identity(org: Option<&str>, name: &str) -> RepoIdentity {
        RepoIdentity {
            org: org.map(str::to_string),
            name: name.to_string(),
            subpath: String::new(),
            requested: Version::major(1),
            resolved: None,
            format: PathFormat::Current,
            redirected_from: None,
        }
    }

    #[test]
    fn test_builtin_fsnotify() {
        let table = RedirectTable::builtin();
        let mut repo = identity(None, "fsnotify");

        assert!(table.apply(&mut repo));
        assert_eq!(repo.org.as_deref(), Some("fsnotify"));
        assert_eq!(repo.name, "fsnotify");
        assert_eq!(repo.redirected_from, Some(RepoBase::new(None, "fsnotify")));
    }

    #[test]
    fn test_unmapped_identity_untouched() {
        let table = RedirectTable::builtin();
        let mut repo = identity(Some("someone"), "fsnotify");
        let before = repo.clone();

        assert!(!table.apply(&mut repo));
        assert_eq!(repo, before);
    }

    #[test]
    fn test_apply_is_not_transitive() {
        let table: RedirectTable = [
            (RepoBase::new(None, "a"), RepoBase::new(Some("b"), "b")),
            (RepoBase::new(Some("b"), "b"), RepoBase::new(Some("c"), "c")),
        ]
        .into_iter()
        .collect();

        let mut repo = identity(None, "a");
        assert!(table.apply(&mut repo));
        assert_eq!(repo.base(), RepoBase::new(Some("b"), "b"));
        assert_eq!(repo.original().base(), RepoBase::new(None, "a"));
    }
}
