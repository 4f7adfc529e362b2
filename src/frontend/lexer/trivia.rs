use super::Comment;
use super::state::Lexer;

impl<'a> Lexer<'a> {
    /// Skip blanks other than newlines; newlines drive semicolon insertion.
    pub(super) fn consume_whitespace(&mut self) {
        while let Some((_, ch)) = self.lookahead {
            if ch == '\n' || !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    pub(super) fn consume_comment(&mut self, start: usize) {
        let line = self.line;
        self.bump(); // consume '/'
        let block = matches!(self.lookahead, Some((_, '*')));
        self.bump(); // consume '/' or '*'
        let mut end = start + 2;
        if block {
            let mut last_char = '\0';
            let mut terminated = false;
            while let Some((idx, ch)) = self.lookahead {
                end = idx + ch.len_utf8();
                self.bump();
                if last_char == '*' && ch == '/' {
                    terminated = true;
                    break;
                }
                last_char = ch;
            }
            if !terminated {
                self.diagnostics
                    .push_error("comment not terminated", Some(self.span(start, end)));
            }
        } else {
            while let Some((idx, ch)) = self.lookahead {
                if ch == '\n' {
                    break;
                }
                end = idx + ch.len_utf8();
                self.bump();
            }
        }
        let end_line = self.line;
        if block && end_line > line && self.insert_semi {
            self.emit_auto_semicolon(start);
        }
        self.comments.push(Comment {
            text: self.slice(start, end).to_string(),
            span: self.span(start, end),
            line,
            end_line,
        });
    }
}
