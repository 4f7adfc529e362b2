//! Comment grouping and doc-comment attachment.

use std::collections::HashMap;

use super::Parser;
use crate::frontend::lexer::{Comment, Token};

/// Run of comments with no blank line or token between them.
#[derive(Debug)]
struct CommentGroup {
    line: u32,
    end_line: u32,
    lines: Vec<String>,
}

#[derive(Debug, Default)]
pub(super) struct CommentIndex {
    groups: Vec<CommentGroup>,
    by_end_line: HashMap<u32, usize>,
    build_constraint: Option<(usize, String)>,
}

impl CommentIndex {
    pub(super) fn build(comments: &[Comment], tokens: &[Token]) -> Self {
        let mut index = Self::default();
        let mut current: Option<CommentGroup> = None;
        for comment in comments {
            let trailing = is_trailing(comment, tokens);
            let continues = current
                .as_ref()
                .is_some_and(|group| !trailing && comment.line <= group.end_line + 1);
            if !continues && let Some(group) = current.take() {
                index.push(group);
            }
            let group = current.get_or_insert_with(|| CommentGroup {
                line: comment.line,
                end_line: comment.end_line,
                lines: Vec::new(),
            });
            group.end_line = comment.end_line;
            group.lines.extend(comment_lines(comment));

            if index.build_constraint.is_none()
                && comment.text.starts_with("//")
                && let Some(expr) = comment.body().strip_prefix("go:build")
            {
                index.build_constraint = Some((comment.span.start, expr.trim().to_string()));
            }
        }
        if let Some(group) = current {
            index.push(group);
        }
        index
    }

    fn push(&mut self, group: CommentGroup) {
        self.by_end_line.insert(group.end_line, self.groups.len());
        self.groups.push(group);
    }
}

fn is_trailing(comment: &Comment, tokens: &[Token]) -> bool {
    let before = tokens.partition_point(|token| token.span.start < comment.span.start);
    tokens[..before]
        .iter()
        .rev()
        .find(|token| token.lexeme != "\n")
        .is_some_and(|token| token.line == comment.line)
}

fn is_directive(line: &str) -> bool {
    match line.split_once(':') {
        Some((head, tail)) => {
            !head.is_empty()
                && head
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && tail.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn comment_lines(comment: &Comment) -> Vec<String> {
    if comment.text.starts_with("//") {
        let body = comment.body();
        if is_directive(body) {
            return Vec::new();
        }
        vec![body.strip_prefix(' ').unwrap_or(body).to_string()]
    } else {
        comment
            .body()
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect()
    }
}

parser_impl! {
    /// Doc comment for the construct starting at token `index`: the group ending
    /// on the line directly above it, not shared with an earlier token's line.
    pub(super) fn doc_for(&self, index: usize) -> Option<String> {
        let token = self.tokens.get(index)?;
        let group_index = *self.comments.by_end_line.get(&token.line.checked_sub(1)?)?;
        let group = &self.comments.groups[group_index];
        let prev_line = self.tokens[..index]
            .iter()
            .rev()
            .find(|token| token.lexeme != "\n")
            .map_or(0, |token| token.line);
        if group.line <= prev_line {
            return None;
        }
        let mut lines: Vec<&str> = group.lines.iter().map(String::as_str).collect();
        while lines.first().is_some_and(|line| line.trim().is_empty()) {
            lines.remove(0);
        }
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// `//go:build` expression appearing before the package clause.
    pub(super) fn build_constraint(&self, package_offset: usize) -> Option<String> {
        self.comments
            .build_constraint
            .as_ref()
            .filter(|(offset, _)| *offset < package_offset)
            .map(|(_, expr)| expr.clone())
    }
}
