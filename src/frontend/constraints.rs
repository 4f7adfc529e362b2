//! File selection: `_GOOS_GOARCH` file name suffixes and `//go:build`
//! expressions evaluated against the target platform.

use std::collections::HashSet;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::build_info::BuildInfo;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Generated files owned by the build tool are never analysed.
const GENERATED_FILE: &str = "encore.gen.go";

/// Tag set derived from a [`BuildInfo`].
#[derive(Debug, Clone)]
pub struct BuildContext {
    goos: String,
    goarch: String,
    parse_tests: bool,
    tags: HashSet<String>,
}

impl BuildContext {
    #[must_use]
    pub fn new(info: &BuildInfo) -> Self {
        let mut tags: HashSet<String> = info.build_tags.iter().cloned().collect();
        tags.insert(info.goos.clone());
        tags.insert(info.goarch.clone());
        tags.insert("gc".to_string());
        if UNIX_OS.contains(&info.goos.as_str()) {
            tags.insert("unix".to_string());
        }
        match info.goos.as_str() {
            "android" => {
                tags.insert("linux".to_string());
            }
            "illumos" => {
                tags.insert("solaris".to_string());
            }
            "ios" => {
                tags.insert("darwin".to_string());
            }
            _ => {}
        }
        let (major, minor) = info.go_release();
        for release in 1..=minor {
            tags.insert(format!("go{major}.{release}"));
        }
        Self {
            goos: info.goos.clone(),
            goarch: info.goarch.clone(),
            parse_tests: info.parse_tests,
            tags,
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether a directory entry is a Go source file considered for loading,
    /// judged by its name alone.
    #[must_use]
    pub fn accepts_file_name(&self, name: &str) -> bool {
        let Some(stem) = name.strip_suffix(".go") else {
            return false;
        };
        if stem.is_empty() || name.starts_with('_') || name.starts_with('.') {
            return false;
        }
        if name == GENERATED_FILE {
            return false;
        }
        let stem = match stem.strip_suffix("_test") {
            Some(_) if !self.parse_tests => return false,
            Some(stem) => stem,
            None => stem,
        };
        self.matches_platform_suffix(stem)
    }

    fn matches_platform_suffix(&self, stem: &str) -> bool {
        // Only the part after the first underscore can carry a suffix.
        let Some((_, rest)) = stem.split_once('_') else {
            return true;
        };
        let parts: Vec<&str> = rest.split('_').collect();
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_os(parts[n - 2]) && parts[n - 1] == self.goarch;
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) {
            return self.matches_os(last);
        }
        if KNOWN_ARCH.contains(&last) {
            return last == self.goarch;
        }
        true
    }

    fn matches_os(&self, os: &str) -> bool {
        os == self.goos
            || (os == "linux" && self.goos == "android")
            || (os == "solaris" && self.goos == "illumos")
            || (os == "darwin" && self.goos == "ios")
    }

    /// Evaluate a `//go:build` expression such as `linux && (amd64 || arm64)`.
    pub fn eval_constraint(&self, expr: &str) -> Result<bool, ConstraintError> {
        ConstraintParser::new(expr, self)?.parse()
    }
}

/// Malformed `//go:build` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintError {
    pub message: String,
    pub offset: usize,
}

impl ConstraintError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid build constraint at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ConstraintError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Tag(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    End,
}

struct ConstraintLexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> ConstraintLexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<(Token, usize), ConstraintError> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }
        let Some((offset, ch)) = self.chars.next() else {
            return Ok((Token::End, self.input.len()));
        };
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '!' => Token::Not,
            '&' | '|' => {
                if self.chars.next_if(|&(_, next)| next == ch).is_none() {
                    return Err(ConstraintError::new(format!("expected '{ch}{ch}'"), offset));
                }
                if ch == '&' { Token::And } else { Token::Or }
            }
            ch if is_tag_char(ch) => {
                let mut end = offset + ch.len_utf8();
                while let Some((index, next)) = self.chars.next_if(|&(_, next)| is_tag_char(next)) {
                    end = index + next.len_utf8();
                }
                Token::Tag(self.input[offset..end].to_string())
            }
            other => {
                return Err(ConstraintError::new(
                    format!("unexpected character '{other}'"),
                    offset,
                ));
            }
        };
        Ok((token, offset))
    }
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

struct ConstraintParser<'a> {
    current: Token,
    offset: usize,
    lexer: ConstraintLexer<'a>,
    context: &'a BuildContext,
}

impl<'a> ConstraintParser<'a> {
    fn new(input: &'a str, context: &'a BuildContext) -> Result<Self, ConstraintError> {
        let mut lexer = ConstraintLexer::new(input);
        let (current, offset) = lexer.next_token()?;
        Ok(Self {
            current,
            offset,
            lexer,
            context,
        })
    }

    fn parse(mut self) -> Result<bool, ConstraintError> {
        let value = self.parse_or()?;
        if self.current != Token::End {
            return Err(ConstraintError::new(
                "unexpected tokens after expression",
                self.offset,
            ));
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> Result<bool, ConstraintError> {
        let mut value = self.parse_and()?;
        while self.current == Token::Or {
            self.bump()?;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, ConstraintError> {
        let mut value = self.parse_unary()?;
        while self.current == Token::And {
            self.bump()?;
            let rhs = self.parse_unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> Result<bool, ConstraintError> {
        match std::mem::replace(&mut self.current, Token::End) {
            Token::Not => {
                self.bump()?;
                Ok(!self.parse_unary()?)
            }
            Token::LParen => {
                self.bump()?;
                let value = self.parse_or()?;
                if self.current != Token::RParen {
                    return Err(ConstraintError::new("expected ')'", self.offset));
                }
                self.bump()?;
                Ok(value)
            }
            Token::Tag(tag) => {
                self.bump()?;
                Ok(self.context.has_tag(&tag))
            }
            _ => Err(ConstraintError::new("expected build tag", self.offset)),
        }
    }

    fn bump(&mut self) -> Result<(), ConstraintError> {
        let (token, offset) = self.lexer.next_token()?;
        self.current = token;
        self.offset = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(goos: &str, goarch: &str) -> BuildContext {
        let mut info = BuildInfo::new("/app").with_tags(["integration"]);
        info.goos = goos.to_string();
        info.goarch = goarch.to_string();
        info.go_version = "1.21".to_string();
        BuildContext::new(&info)
    }

    #[test]
    fn file_name_suffixes_select_platform() {
        let linux = context("linux", "amd64");
        assert!(linux.accepts_file_name("api.go"));
        assert!(linux.accepts_file_name("linux.go"));
        assert!(linux.accepts_file_name("api_linux.go"));
        assert!(linux.accepts_file_name("api_linux_amd64.go"));
        assert!(!linux.accepts_file_name("api_windows.go"));
        assert!(!linux.accepts_file_name("api_linux_arm64.go"));
        assert!(!linux.accepts_file_name("api_arm64.go"));
        assert!(linux.accepts_file_name("api_helpers.go"));
        assert!(context("android", "arm64").accepts_file_name("x_linux.go"));
    }

    #[test]
    fn skips_ignored_and_test_files() {
        let ctx = context("linux", "amd64");
        assert!(!ctx.accepts_file_name("_hidden.go"));
        assert!(!ctx.accepts_file_name(".swap.go"));
        assert!(!ctx.accepts_file_name("encore.gen.go"));
        assert!(!ctx.accepts_file_name("api_test.go"));
        assert!(!ctx.accepts_file_name("README.md"));

        let mut info = BuildInfo::new("/app").with_tests(true);
        info.goos = "linux".to_string();
        let with_tests = BuildContext::new(&info);
        assert!(with_tests.accepts_file_name("api_test.go"));
        assert!(!with_tests.accepts_file_name("api_windows_test.go"));
    }

    #[test]
    fn evaluates_build_expressions() {
        let ctx = context("darwin", "arm64");
        assert_eq!(ctx.eval_constraint("darwin && arm64"), Ok(true));
        assert_eq!(ctx.eval_constraint("linux || (unix && !windows)"), Ok(true));
        assert_eq!(ctx.eval_constraint("!integration"), Ok(false));
        assert_eq!(ctx.eval_constraint("go1.21 && gc"), Ok(true));
        assert_eq!(ctx.eval_constraint("go1.22"), Ok(false));
        assert_eq!(ctx.eval_constraint("ignore"), Ok(false));
    }

    #[test]
    fn rejects_malformed_expressions() {
        let ctx = context("linux", "amd64");
        assert!(ctx.eval_constraint("linux &").is_err());
        assert!(ctx.eval_constraint("(linux").is_err());
        assert!(ctx.eval_constraint("linux amd64").is_err());
        assert!(ctx.eval_constraint("").is_err());
    }
}
