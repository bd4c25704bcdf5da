//! Tokens for the post-processor option string
//!
//! Accepts `--flag`, `--key=value`, `--key value` and quoted values.

use logos::Logos;

use super::LexerError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(error = LexerError)]
pub enum OptionToken {
    #[token("--no-header")]
    #[token("--suppress-header")]
    NoHeader,

    #[token("--no-comments")]
    #[token("--suppress-comments")]
    NoComments,

    #[token("--line-numbers")]
    LineNumbers,

    #[token("--no-show-editor")]
    NoShowEditor,

    #[token("--precision")]
    Precision,

    #[token("--preamble")]
    Preamble,

    #[token("--postamble")]
    Postamble,

    #[token("--inches")]
    #[token("--imperial")]
    Inches,

    #[token("--no-modal")]
    NoModal,

    #[token("--no-axis-modal")]
    NoAxisModal,

    #[token("--no-tlo")]
    NoTlo,

    #[regex(r"--[A-Za-z0-9][A-Za-z0-9_-]*", |lex| lex.slice().to_string())]
    Unknown(String),

    #[token("=")]
    Equals,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| unquote(lex.slice()))]
    Quoted(String),

    #[regex(r#"[^\s"'=-][^\s"'=]*"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Strip the surrounding quotes, resolving escaped double quotes
fn unquote(slice: &str) -> String {
    slice[1..slice.len() - 1].replace("\\\"", "\"")
}
