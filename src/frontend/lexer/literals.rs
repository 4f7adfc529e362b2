use super::LiteralKind;
use super::state::Lexer;

impl<'a> Lexer<'a> {
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while let Some((_, ch)) = self.lookahead {
            if !pred(ch) {
                break;
            }
            count += usize::from(ch != '_');
            self.bump();
        }
        count
    }

    fn scan_exponent(&mut self) -> Result<(), String> {
        self.bump(); // consume 'e' or 'p'
        if matches!(self.lookahead, Some((_, '+' | '-'))) {
            self.bump();
        }
        if self.take_while(|c| c.is_ascii_digit() || c == '_') == 0 {
            return Err("exponent has no digits".to_string());
        }
        Ok(())
    }

    /// Consume a numeric literal starting at the lookahead.
    pub(super) fn scan_number(&mut self) -> Result<LiteralKind, String> {
        let mut kind = LiteralKind::Int;
        let prefix = match (self.lookahead, self.peek_next_char()) {
            (Some((_, '0')), Some((_, p))) if matches!(p, 'x' | 'X' | 'b' | 'B' | 'o' | 'O') => {
                Some(p.to_ascii_lowercase())
            }
            _ => None,
        };
        match prefix {
            Some('x') => {
                self.bump();
                self.bump();
                let mut digits = self.take_while(|c| c.is_ascii_hexdigit() || c == '_');
                if matches!(self.lookahead, Some((_, '.'))) {
                    self.bump();
                    kind = LiteralKind::Float;
                    digits += self.take_while(|c| c.is_ascii_hexdigit() || c == '_');
                }
                if digits == 0 {
                    return Err("hexadecimal literal has no digits".to_string());
                }
                if matches!(self.lookahead, Some((_, 'p' | 'P'))) {
                    kind = LiteralKind::Float;
                    self.scan_exponent()?;
                } else if kind == LiteralKind::Float {
                    return Err("hexadecimal mantissa requires a 'p' exponent".to_string());
                }
            }
            Some(radix_char) => {
                self.bump();
                self.bump();
                let radix = if radix_char == 'b' { 2 } else { 8 };
                let start = self.offset();
                self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let digits = self.slice(start, self.offset()).to_string();
                if let Some(bad) = digits.chars().find(|c| *c != '_' && !c.is_digit(radix)) {
                    let name = if radix == 2 { "binary" } else { "octal" };
                    return Err(format!("invalid digit {bad:?} in {name} literal"));
                }
                if digits.chars().all(|c| c == '_') {
                    return Err("literal has no digits".to_string());
                }
            }
            None => {
                self.take_while(|c| c.is_ascii_digit() || c == '_');
                if matches!(self.lookahead, Some((_, '.'))) {
                    self.bump();
                    kind = LiteralKind::Float;
                    self.take_while(|c| c.is_ascii_digit() || c == '_');
                }
                if matches!(self.lookahead, Some((_, 'e' | 'E'))) {
                    kind = LiteralKind::Float;
                    self.scan_exponent()?;
                }
            }
        }
        if matches!(self.lookahead, Some((_, 'i'))) {
            self.bump();
            kind = LiteralKind::Imaginary;
        }
        Ok(kind)
    }
}

/// Parse an integer literal in any Go base. Returns `None` for floats or
/// values that overflow `u64`.
#[must_use]
pub fn parse_int_literal(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Decode a string or rune literal as written in source, including the quotes.
#[must_use]
pub fn unquote(literal: &str) -> Option<String> {
    if let Some(raw) = literal
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    {
        return Some(raw.replace('\r', ""));
    }
    let body = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            literal
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let escaped = chars.next()?;
        let decoded = match escaped {
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0B}',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'x' => hex_escape(&mut chars, 2)?,
            'u' => hex_escape(&mut chars, 4)?,
            'U' => hex_escape(&mut chars, 8)?,
            '0'..='7' => {
                let mut value = escaped.to_digit(8)?;
                for _ in 0..2 {
                    value = value * 8 + chars.next()?.to_digit(8)?;
                }
                char::from_u32(value)?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..len {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_bases() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("017"), Some(15));
        assert_eq!(parse_int_literal("0"), Some(0));
        assert_eq!(parse_int_literal("1.5"), None);
    }

    #[test]
    fn unquotes_interpreted_and_raw_strings() {
        assert_eq!(unquote(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(unquote(r#""\x41é\101""#).as_deref(), Some("AéA"));
        assert_eq!(unquote("`json:\"id\"`").as_deref(), Some("json:\"id\""));
        assert_eq!(unquote(r"'\''").as_deref(), Some("'"));
        assert_eq!(unquote(r#""\q""#), None);
        assert_eq!(unquote("bare"), None);
    }
}
