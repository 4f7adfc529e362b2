//! Local names of imports written without an alias.
//!
//! The declared package name is only known after loading the package, so
//! candidates are tried in order of how likely they are to match: paths whose
//! last segment equals the identifier first, then the rest by edit distance.

use std::collections::HashMap;

use crate::diagnostics::Span;
use crate::error::Result;
use crate::loader::PackageLoader;
use crate::paths::PkgPath;

/// Memoized resolution of identifiers against a file's unaliased imports.
#[derive(Debug, Default)]
pub(super) struct UnaliasedImports {
    paths: Vec<PkgPath>,
    memo: HashMap<String, Option<PkgPath>>,
}

impl UnaliasedImports {
    pub(super) fn push(&mut self, path: PkgPath) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Import whose declared package name is `name`, loading candidate
    /// packages as needed. Negative results are remembered too.
    pub(super) fn resolve(
        &mut self,
        loader: &PackageLoader,
        name: &str,
        cause: Span,
    ) -> Result<Option<PkgPath>> {
        if let Some(known) = self.memo.get(name) {
            return Ok(known.clone());
        }
        let (exact, rest) = order_candidates(name, &self.paths);
        let mut found = None;
        for path in exact {
            match loader.load_package(Some(cause), path)? {
                Some(package) if package.name != name => continue,
                // Unloadable packages keep the conventional last-segment name.
                Some(_) | None => {
                    found = Some(path.clone());
                    break;
                }
            }
        }
        if found.is_none() {
            for path in rest {
                if let Some(package) = loader.load_package(Some(cause), path)?
                    && package.name == name
                {
                    found = Some(path.clone());
                    break;
                }
            }
        }
        self.memo.insert(name.to_string(), found.clone());
        Ok(found)
    }

    /// Every identifier resolved so far, with its import.
    pub(super) fn resolved(&self) -> impl Iterator<Item = (&String, &PkgPath)> {
        self.memo
            .iter()
            .filter_map(|(name, path)| path.as_ref().map(|path| (name, path)))
    }
}

/// Split candidates into exact last-segment matches and the remainder sorted
/// by ascending edit distance (stable for ties).
fn order_candidates<'a>(name: &str, paths: &'a [PkgPath]) -> (Vec<&'a PkgPath>, Vec<&'a PkgPath>) {
    let (exact, mut rest): (Vec<&PkgPath>, Vec<&PkgPath>) =
        paths.iter().partition(|path| path.last_segment() == name);
    rest.sort_by_cached_key(|path| edit_distance(path.last_segment(), name));
    (exact, rest)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PkgPath> {
        list.iter().map(|p| PkgPath::new(*p).unwrap()).collect()
    }

    #[test]
    fn exact_segments_come_first_then_by_distance() {
        // `go-yaml` and `yaml.v3` are both three edits away and keep their order.
        let candidates = paths(&[
            "example.com/app/go-yaml",
            "gopkg.in/yaml.v3",
            "example.com/app/yaml",
            "example.com/app/zzzzzzzz",
        ]);
        let (exact, rest) = order_candidates("yaml", &candidates);
        let exact: Vec<_> = exact.iter().map(|p| p.as_str()).collect();
        let rest: Vec<_> = rest.iter().map(|p| p.as_str()).collect();
        assert_eq!(exact, ["example.com/app/yaml"]);
        assert_eq!(
            rest,
            ["example.com/app/go-yaml", "gopkg.in/yaml.v3", "example.com/app/zzzzzzzz"]
        );
    }

    #[test]
    fn edit_distance_counts_operations() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
