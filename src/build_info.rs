//! Read-only build descriptor supplied when an analysis is created.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default module path of the runtime-support library.
pub const DEFAULT_RUNTIME_MODULE: &str = "encore.dev";

/// Qualified name of the generic present-or-absent wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionTypeName {
    pub package: String,
    pub name: String,
}

impl Default for OptionTypeName {
    fn default() -> Self {
        Self {
            package: "encore.dev/types/option".to_string(),
            name: "Option".to_string(),
        }
    }
}

/// Target platform, file selection and disk layout used by one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BuildInfo {
    pub goos: String,
    pub goarch: String,
    /// Language version as `major.minor`, used for `goX.Y` release tags.
    pub go_version: String,
    /// Include `_test.go` files when loading packages.
    pub parse_tests: bool,
    pub build_tags: Vec<String>,
    /// Root directory of the main module (the directory holding `go.mod`).
    pub app_root: PathBuf,
    pub runtime_module: String,
    pub runtime_dir: Option<PathBuf>,
    pub goroot: Option<PathBuf>,
    pub mod_cache: Option<PathBuf>,
    pub option_type: OptionTypeName,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            goos: "linux".to_string(),
            goarch: "amd64".to_string(),
            go_version: "1.22".to_string(),
            parse_tests: false,
            build_tags: Vec::new(),
            app_root: PathBuf::new(),
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            runtime_dir: None,
            goroot: None,
            mod_cache: None,
            option_type: OptionTypeName::default(),
        }
    }
}

impl BuildInfo {
    #[must_use]
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `GOOS`, `GOARCH`, `GOROOT`, `GOMODCACHE` and the
    /// `-tags` flag in `GOFLAGS`.
    #[must_use]
    pub fn from_env(app_root: impl Into<PathBuf>) -> Self {
        let lookup = |key: &str| env::var(key).ok().filter(|value| !value.is_empty());
        Self::from_lookup(app_root, lookup)
    }

    fn from_lookup(app_root: impl Into<PathBuf>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut info = Self::new(app_root);
        if let Some(goos) = lookup("GOOS") {
            info.goos = goos;
        }
        if let Some(goarch) = lookup("GOARCH") {
            info.goarch = goarch;
        }
        info.goroot = lookup("GOROOT").map(PathBuf::from);
        info.mod_cache = lookup("GOMODCACHE")
            .map(PathBuf::from)
            .or_else(|| lookup("GOPATH").map(|gopath| PathBuf::from(gopath).join("pkg/mod")));
        if let Some(flags) = lookup("GOFLAGS") {
            info.build_tags = tags_from_goflags(&flags);
        }
        info
    }

    /// Parse a JSON build descriptor; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|err| Error::internal(format!("invalid build descriptor: {err}")))
    }

    #[must_use]
    pub fn with_tests(mut self, parse_tests: bool) -> Self {
        self.parse_tests = parse_tests;
        self
    }

    #[must_use]
    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = Some(goroot.into());
        self
    }

    #[must_use]
    pub fn with_mod_cache(mut self, mod_cache: impl Into<PathBuf>) -> Self {
        self.mod_cache = Some(mod_cache.into());
        self
    }

    #[must_use]
    pub fn with_runtime_dir(mut self, runtime_dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(runtime_dir.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Parsed `go_version` as `(major, minor)`.
    #[must_use]
    pub fn go_release(&self) -> (u32, u32) {
        let mut parts = self.go_version.trim_start_matches("go").split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    }
}

fn tags_from_goflags(flags: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut words = flags.split_whitespace();
    while let Some(word) = words.next() {
        let value = if let Some(value) = word
            .strip_prefix("-tags=")
            .or_else(|| word.strip_prefix("--tags="))
        {
            Some(value.to_string())
        } else if word == "-tags" || word == "--tags" {
            words.next().map(str::to_string)
        } else {
            None
        };
        if let Some(value) = value {
            tags.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string),
            );
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("GOOS", "darwin"),
            ("GOARCH", "arm64"),
            ("GOROOT", "/usr/local/go"),
            ("GOPATH", "/home/dev/go"),
            ("GOFLAGS", "-mod=mod -tags=integration,local"),
        ]
        .into_iter()
        .collect();
        let info = BuildInfo::from_lookup("/app", |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(info.goos, "darwin");
        assert_eq!(info.goarch, "arm64");
        assert_eq!(info.goroot, Some(PathBuf::from("/usr/local/go")));
        assert_eq!(info.mod_cache, Some(PathBuf::from("/home/dev/go/pkg/mod")));
        assert_eq!(info.build_tags, vec!["integration", "local"]);
    }

    #[test]
    fn separate_tags_flag_is_understood() {
        assert_eq!(tags_from_goflags("-tags foo,bar -v"), vec!["foo", "bar"]);
        assert!(tags_from_goflags("-mod=vendor").is_empty());
    }

    #[test]
    fn json_descriptor_fills_defaults() {
        let info = BuildInfo::from_json(
            r#"{"goos": "windows", "app_root": "/srv/app", "parse_tests": true}"#,
        )
        .unwrap();
        assert_eq!(info.goos, "windows");
        assert_eq!(info.goarch, "amd64");
        assert!(info.parse_tests);
        assert_eq!(info.runtime_module, DEFAULT_RUNTIME_MODULE);
        assert_eq!(info.option_type, OptionTypeName::default());
        assert!(BuildInfo::from_json("{").is_err());
    }

    #[test]
    fn go_release_parses_major_minor() {
        let mut info = BuildInfo::default();
        info.go_version = "go1.21.3".to_string();
        assert_eq!(info.go_release(), (1, 21));
    }
}
