//! Struct field tags in the conventional `key:"name,opt"` form.

use crate::frontend::lexer::unquote;

/// One `key:"value"` entry of a struct tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub key: String,
    pub name: String,
    pub options: Vec<String>,
}

/// Parsed struct tag. Entries keep source order; a malformed tail stops
/// parsing and leaves the entries read so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructTag {
    pub entries: Vec<TagEntry>,
}

impl StructTag {
    /// Parse a tag from its source literal (raw or interpreted string).
    #[must_use]
    pub fn from_literal(literal: &str) -> Self {
        unquote(literal).map_or_else(Self::default, |text| Self::parse(&text))
    }

    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut rest = text;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            let key_len = rest
                .find(|ch: char| ch <= ' ' || ch == ':' || ch == '"' || ch == '\u{7f}')
                .unwrap_or(rest.len());
            if key_len == 0 || !rest[key_len..].starts_with(":\"") {
                break;
            }
            let key = &rest[..key_len];
            let after = &rest[key_len + 1..];
            let Some(end) = closing_quote(after) else {
                break;
            };
            let Some(value) = unquote(&after[..=end]) else {
                break;
            };
            rest = &after[end + 1..];
            let mut parts = value.split(',');
            let name = parts.next().unwrap_or_default().to_string();
            entries.push(TagEntry {
                key: key.to_string(),
                name,
                options: parts.map(str::to_string).collect(),
            });
        }
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TagEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TagEntry {
    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }
}

/// Index of the closing quote of the quoted string starting at `text[0]`.
fn closing_quote(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = 1;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'"' => return Some(index),
            _ => index += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_options() {
        let tag = StructTag::from_literal(r#"`json:"user_id,omitempty" query:"uid" encore:"sensitive"`"#);
        assert_eq!(tag.entries.len(), 3);
        let json = tag.get("json").unwrap();
        assert_eq!(json.name, "user_id");
        assert!(json.has_option("omitempty"));
        assert_eq!(tag.get("query").unwrap().name, "uid");
        assert!(tag.get("header").is_none());
    }

    #[test]
    fn stops_at_malformed_tail() {
        let tag = StructTag::parse(r#"json:"a" broken json2:"b""#);
        assert_eq!(tag.entries.len(), 1);
        assert!(StructTag::parse("").is_empty());
        assert_eq!(StructTag::parse(r#"x:"a\"b""#).entries[0].name, "a\"b");
    }
}
