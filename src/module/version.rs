use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Module version in canonical `vMAJOR.MINOR.PATCH[-pre][+build]` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    message: String,
}

impl ModVersion {
    /// Placeholder version for modules that declare none.
    pub const ZERO: Self = Self {
        major: 0,
        minor: 0,
        patch: 0,
        pre: None,
        build: None,
    };

    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        parse_version(text)
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// `v0.0.0-<timestamp>-<commit>` style versions minted for untagged commits.
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.pre.as_deref().is_some_and(|pre| {
            pre.split(['.', '-'])
                .any(|part| part.len() == 14 && part.bytes().all(|b| b.is_ascii_digit()))
        })
    }
}

impl FromStr for ModVersion {
    type Err = VersionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_version(text)
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl Ord for ModVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for ModVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn parse_version(text: &str) -> Result<ModVersion, VersionParseError> {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix('v') else {
        return Err(VersionParseError::new(format!(
            "version `{trimmed}` must start with `v`"
        )));
    };
    let (body, build) = match body.split_once('+') {
        Some((body, build)) => (body, Some(build)),
        None => (body, None),
    };
    let (core, pre) = match body.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (body, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 {
        return Err(VersionParseError::new(format!(
            "version `{trimmed}` must have major, minor and patch components"
        )));
    }
    let major = parse_component(parts[0])?;
    let minor = parse_component(parts[1])?;
    let patch = parse_component(parts[2])?;
    for (label, extra) in [("pre-release", pre), ("build metadata", build)] {
        if let Some(extra) = extra
            && (extra.is_empty()
                || !extra
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-'))
        {
            return Err(VersionParseError::new(format!(
                "invalid {label} `{extra}` in version `{trimmed}`"
            )));
        }
    }
    Ok(ModVersion {
        major,
        minor,
        patch,
        pre: pre.map(str::to_string),
        build: build.map(str::to_string),
    })
}

fn parse_component(text: &str) -> Result<u64, VersionParseError> {
    if text.is_empty() {
        return Err(VersionParseError::new("version component must not be empty"));
    }
    if text.len() > 1 && text.starts_with('0') {
        return Err(VersionParseError::new(format!(
            "version component `{text}` has a leading zero"
        )));
    }
    text.parse::<u64>().map_err(|_| {
        VersionParseError::new(format!("invalid numeric component `{text}` in version"))
    })
}

impl VersionParseError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for VersionParseError {}
