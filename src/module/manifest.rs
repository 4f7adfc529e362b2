//! `go.mod` parsing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::module::version::ModVersion;
use crate::paths::ModPath;

pub const MANIFEST_FILE: &str = "go.mod";

/// `require path version [// indirect]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: ModPath,
    pub version: ModVersion,
    pub indirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTarget {
    /// Local directory, relative paths taken from the declaring module root.
    Dir(PathBuf),
    Module { path: ModPath, version: ModVersion },
}

/// `replace old [version] => new [version]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub path: ModPath,
    pub version: Option<ModVersion>,
    pub target: ReplaceTarget,
}

/// Parsed `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub module: ModPath,
    pub go_version: Option<String>,
    pub toolchain: Option<String>,
    pub requires: Vec<Requirement>,
    pub replaces: Vec<Replacement>,
    pub excludes: Vec<(ModPath, ModVersion)>,
    /// Raw retracted versions or `[low, high]` ranges.
    pub retracts: Vec<String>,
}

impl Manifest {
    /// Manifest for a dependency that ships without one.
    #[must_use]
    pub fn synthesized(module: ModPath) -> Self {
        Self {
            module,
            go_version: None,
            toolchain: None,
            requires: Vec::new(),
            replaces: Vec::new(),
            excludes: Vec::new(),
            retracts: Vec::new(),
        }
    }

    /// Read `<dir>/go.mod`; `Ok(None)` when the file does not exist.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&path.display().to_string(), &text).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Parse manifest text. `origin` names the file in error messages.
    pub fn parse(origin: &str, text: &str) -> Result<Self> {
        ManifestParser {
            origin,
            module: None,
            go_version: None,
            toolchain: None,
            requires: Vec::new(),
            replaces: Vec::new(),
            excludes: Vec::new(),
            retracts: Vec::new(),
        }
        .run(text)
    }

    /// Version of `path` required by this manifest.
    #[must_use]
    pub fn required_version(&self, path: &ModPath) -> Option<&ModVersion> {
        self.requires
            .iter()
            .find(|req| &req.path == path)
            .map(|req| &req.version)
    }

    /// Replacement for `path@version`. A version-specific directive wins
    /// over one that covers every version.
    #[must_use]
    pub fn replacement(&self, path: &ModPath, version: &ModVersion) -> Option<&Replacement> {
        let mut fallback = None;
        for rep in self.replaces.iter().filter(|rep| &rep.path == path) {
            match &rep.version {
                Some(v) if v == version => return Some(rep),
                Some(_) => {}
                None => fallback = Some(rep),
            }
        }
        fallback
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    line_no: usize,
    words: Vec<String>,
    indirect: bool,
}

struct ManifestParser<'a> {
    origin: &'a str,
    module: Option<ModPath>,
    go_version: Option<String>,
    toolchain: Option<String>,
    requires: Vec<Requirement>,
    replaces: Vec<Replacement>,
    excludes: Vec<(ModPath, ModVersion)>,
    retracts: Vec<String>,
}

impl ManifestParser<'_> {
    fn run(mut self, text: &str) -> Result<Manifest> {
        let mut block: Option<String> = None;
        for (index, raw) in text.lines().enumerate() {
            let line = self.tokenize(index + 1, raw)?;
            if line.words.is_empty() {
                continue;
            }
            if let Some(verb) = block.as_deref() {
                if line.words.len() == 1 && line.words[0] == ")" {
                    block = None;
                    continue;
                }
                let verb = verb.to_string();
                self.directive(&verb, &line, &line.words)?;
                continue;
            }
            let verb = line.words[0].clone();
            let args = &line.words[1..];
            if args.len() == 1 && args[0] == "(" {
                if !matches!(verb.as_str(), "require" | "replace" | "exclude" | "retract") {
                    return Err(self.error(line.line_no, format!("`{verb}` does not accept a block")));
                }
                block = Some(verb);
                continue;
            }
            self.directive(&verb, &line, args)?;
        }
        if let Some(verb) = block {
            return Err(Error::manifest(
                self.origin,
                format!("unterminated `{verb}` block"),
            ));
        }
        let Some(module) = self.module else {
            return Err(Error::manifest(self.origin, "missing module directive"));
        };
        Ok(Manifest {
            module,
            go_version: self.go_version,
            toolchain: self.toolchain,
            requires: self.requires,
            replaces: self.replaces,
            excludes: self.excludes,
            retracts: self.retracts,
        })
    }

    fn directive(&mut self, verb: &str, line: &Line, args: &[String]) -> Result<()> {
        let line_no = line.line_no;
        match verb {
            "module" => {
                let [path] = args else {
                    return Err(self.error(line_no, "usage: module path"));
                };
                if self.module.is_some() {
                    return Err(self.error(line_no, "repeated module directive"));
                }
                self.module = Some(self.mod_path(line_no, path)?);
            }
            "go" => {
                let [version] = args else {
                    return Err(self.error(line_no, "usage: go 1.23"));
                };
                if !version.split('.').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())) {
                    return Err(self.error(line_no, format!("invalid go version `{version}`")));
                }
                self.go_version = Some(version.clone());
            }
            "toolchain" => {
                let [name] = args else {
                    return Err(self.error(line_no, "usage: toolchain go1.23.1"));
                };
                self.toolchain = Some(name.clone());
            }
            "require" => {
                let [path, version] = args else {
                    return Err(self.error(line_no, "usage: require module/path v1.2.3"));
                };
                let path = self.mod_path(line_no, path)?;
                let version = self.version(line_no, version)?;
                if let Some(existing) = self.requires.iter_mut().find(|req| req.path == path) {
                    if version > existing.version {
                        existing.version = version;
                    }
                    existing.indirect &= line.indirect;
                } else {
                    self.requires.push(Requirement {
                        path,
                        version,
                        indirect: line.indirect,
                    });
                }
            }
            "replace" => {
                let replacement = self.replacement(line_no, args)?;
                self.replaces.push(replacement);
            }
            "exclude" => {
                let [path, version] = args else {
                    return Err(self.error(line_no, "usage: exclude module/path v1.2.3"));
                };
                let path = self.mod_path(line_no, path)?;
                let version = self.version(line_no, version)?;
                self.excludes.push((path, version));
            }
            "retract" => {
                if args.is_empty() {
                    return Err(self.error(line_no, "usage: retract v1.2.3"));
                }
                self.retracts.push(args.join(" "));
            }
            other => {
                return Err(self.error(line_no, format!("unknown directive: {other}")));
            }
        }
        Ok(())
    }

    fn replacement(&self, line_no: usize, args: &[String]) -> Result<Replacement> {
        let Some(arrow) = args.iter().position(|word| word == "=>") else {
            return Err(self.error(line_no, "usage: replace module/path [v1.2.3] => other/module v1.4.5 | ./dir"));
        };
        let (old, new) = (&args[..arrow], &args[arrow + 1..]);
        let (path, version) = match old {
            [path] => (self.mod_path(line_no, path)?, None),
            [path, version] => (
                self.mod_path(line_no, path)?,
                Some(self.version(line_no, version)?),
            ),
            _ => return Err(self.error(line_no, "invalid replace source")),
        };
        let target = match new {
            [dir] if is_local_dir(dir) => ReplaceTarget::Dir(PathBuf::from(dir)),
            [path, version] if !is_local_dir(path) => ReplaceTarget::Module {
                path: self.mod_path(line_no, path)?,
                version: self.version(line_no, version)?,
            },
            [path] => {
                return Err(self.error(
                    line_no,
                    format!("replacement module `{path}` without version must be a directory path"),
                ));
            }
            _ => return Err(self.error(line_no, "invalid replace target")),
        };
        Ok(Replacement {
            path,
            version,
            target,
        })
    }

    fn tokenize(&self, line_no: usize, raw: &str) -> Result<Line> {
        let mut words = Vec::new();
        let mut indirect = false;
        let mut chars = raw.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                continue;
            }
            if raw[start..].starts_with("//") {
                let comment = raw[start + 2..].trim();
                indirect = comment == "indirect" || comment.starts_with("indirect;");
                break;
            }
            match ch {
                '"' | '`' => {
                    chars.next();
                    let mut value = String::new();
                    let mut closed = false;
                    while let Some((_, next)) = chars.next() {
                        if next == ch {
                            closed = true;
                            break;
                        }
                        if next == '\\' && ch == '"' {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                            continue;
                        }
                        value.push(next);
                    }
                    if !closed {
                        return Err(self.error(line_no, "unterminated quoted string"));
                    }
                    words.push(value);
                }
                '(' | ')' => {
                    chars.next();
                    words.push(ch.to_string());
                }
                _ => {
                    let mut end = start;
                    while let Some(&(index, next)) = chars.peek() {
                        if next.is_whitespace()
                            || next == '"'
                            || next == '('
                            || next == ')'
                            || raw[index..].starts_with("//")
                        {
                            break;
                        }
                        end = index + next.len_utf8();
                        chars.next();
                    }
                    words.push(raw[start..end].to_string());
                }
            }
        }
        Ok(Line {
            line_no,
            words,
            indirect,
        })
    }

    fn mod_path(&self, line_no: usize, text: &str) -> Result<ModPath> {
        ModPath::new(text).map_err(|err| self.error(line_no, err.to_string()))
    }

    fn version(&self, line_no: usize, text: &str) -> Result<ModVersion> {
        ModVersion::parse(text).map_err(|err| self.error(line_no, err.to_string()))
    }

    fn error(&self, line_no: usize, message: impl Into<String>) -> Error {
        Error::manifest(format!("{}:{line_no}", self.origin), message)
    }
}

fn is_local_dir(text: &str) -> bool {
    text.starts_with("./") || text.starts_with("../") || text.starts_with('/') || text == "." || text == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"// Application module.
module example.com/app

go 1.22
toolchain go1.22.4

require (
	encore.dev v1.35.0
	github.com/google/uuid v1.6.0 // indirect
	example.com/app/tools v0.0.0
)

require "golang.org/x/text" v0.14.0

replace example.com/app/tools => ./tools
replace github.com/old/lib v1.0.0 => github.com/new/lib v1.2.0

exclude golang.org/x/net v0.1.0
retract [v1.0.0, v1.0.5] // broken
"#;

    #[test]
    fn parses_directives() {
        let manifest = Manifest::parse("go.mod", SAMPLE).expect("parse manifest");
        assert_eq!(manifest.module.as_str(), "example.com/app");
        assert_eq!(manifest.go_version.as_deref(), Some("1.22"));
        assert_eq!(manifest.toolchain.as_deref(), Some("go1.22.4"));
        assert_eq!(manifest.requires.len(), 4);
        assert!(manifest.requires[1].indirect);
        assert!(!manifest.requires[0].indirect);
        assert_eq!(manifest.requires[3].path.as_str(), "golang.org/x/text");
        assert_eq!(manifest.replaces.len(), 2);
        assert_eq!(
            manifest.replaces[0].target,
            ReplaceTarget::Dir(PathBuf::from("./tools"))
        );
        assert_eq!(manifest.excludes.len(), 1);
        assert_eq!(manifest.retracts, vec!["[v1.0.0, v1.0.5]".to_string()]);
    }

    #[test]
    fn replacement_prefers_exact_version() {
        let manifest = Manifest::parse(
            "go.mod",
            "module a.com/m\nreplace b.com/x => ./x\nreplace b.com/x v1.0.0 => ../x1\n",
        )
        .expect("parse manifest");
        let path = ModPath::new("b.com/x").expect("path");
        let exact = manifest
            .replacement(&path, &ModVersion::new(1, 0, 0))
            .expect("exact");
        assert_eq!(exact.target, ReplaceTarget::Dir(PathBuf::from("../x1")));
        let any = manifest
            .replacement(&path, &ModVersion::new(2, 0, 0))
            .expect("fallback");
        assert_eq!(any.target, ReplaceTarget::Dir(PathBuf::from("./x")));
    }

    #[test]
    fn reports_errors_with_location() {
        let err = Manifest::parse("go.mod", "module a.com/m\nfrobnicate x\n").unwrap_err();
        assert_eq!(err.to_string(), "go.mod:2: unknown directive: frobnicate");
        assert!(Manifest::parse("go.mod", "go 1.22\n").is_err());
        assert!(Manifest::parse("go.mod", "module a.com/m\nrequire (\n").is_err());
        assert!(Manifest::parse("go.mod", "module a.com/m\nrequire b.com/x 1.0\n").is_err());
    }

    #[test]
    fn repeated_requirements_keep_highest_version() {
        let manifest = Manifest::parse(
            "go.mod",
            "module a.com/m\nrequire b.com/x v1.2.0\nrequire b.com/x v1.10.0 // indirect\n",
        )
        .expect("parse manifest");
        assert_eq!(manifest.requires.len(), 1);
        assert_eq!(manifest.requires[0].version, ModVersion::new(1, 10, 0));
        assert!(!manifest.requires[0].indirect);
    }
}
