//! Lexer for thing definition documents using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Tag delimiters (longer patterns win)
    #[token("</")]
    CloseOpen,
    #[token("/>")]
    SelfClose,
    #[token("<")]
    Open,
    #[token(">")]
    Close,
    #[token("=")]
    Equals,

    // Tag and attribute names
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.:\-]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r#""[^"]*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'[^']*'"#, |lex| unescape(lex.slice()))]
    Value(String),

    // Declarations and comments (skip)
    #[regex(r"<\?[^?]*\?>", logos::skip)]
    Declaration,

    #[regex(r"<!--([^-]|-[^-])*-->", logos::skip)]
    Comment,

    // Input no rule matches; the grammar rejects it
    Invalid(String),
}

/// Strip the quotes and decode the predefined XML entities
fn unescape(quoted: &str) -> String {
    quoted[1..quoted.len() - 1]
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input).spanned().map(|(tok, span)| match tok {
        Ok(t) => (t, span),
        Err(()) => (Token::Invalid(input[span.clone()].to_string()), span),
    })
}
