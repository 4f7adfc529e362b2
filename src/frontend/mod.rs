//! Go source frontend: lexer, parser, build constraints and struct tags.

pub mod ast;
pub mod constraints;
pub mod lexer;
pub mod parser;
pub mod struct_tag;
