//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a definition document into an element tree
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Name(s) => s,
    };

    let value = select! {
        Token::Value(s) => s,
    };

    let attribute = name
        .clone()
        .then_ignore(just(Token::Equals))
        .then(value)
        .map(|(name, value)| Attribute { name, value });

    // Duplicate attribute names are rejected, as in XML
    let attributes = attribute
        .repeated()
        .collect::<Vec<_>>()
        .try_map(|attributes: Vec<Attribute>, span| {
            for (i, attr) in attributes.iter().enumerate() {
                if attributes[..i].iter().any(|a| a.name == attr.name) {
                    return Err(Rich::custom(
                        span,
                        format!("duplicate attribute '{}'", attr.name),
                    ));
                }
            }
            Ok(attributes)
        });

    // Recursive element parser
    let element = recursive(|element| {
        let closing_tag = just(Token::CloseOpen)
            .ignore_then(name.clone())
            .then_ignore(just(Token::Close));

        // Either `/>` or `>` children `</tag>`
        let content = choice((
            just(Token::SelfClose).to(None),
            just(Token::Close)
                .ignore_then(element.repeated().collect::<Vec<_>>())
                .then(closing_tag)
                .map(Some),
        ));

        just(Token::Open)
            .ignore_then(name.clone())
            .then(attributes.clone())
            .then(content)
            .try_map(|((tag, attributes), content), span: SimpleSpan| {
                let children = match content {
                    None => Vec::new(),
                    Some((children, closing)) => {
                        if closing != tag {
                            return Err(Rich::custom(
                                span,
                                format!("closing tag '{}' does not match '{}'", closing, tag),
                            ));
                        }
                        children
                    }
                };
                Ok(Element {
                    tag,
                    attributes,
                    children,
                    span: span.into_range(),
                })
            })
            .boxed()
    });

    // A document is exactly one root element
    element.then_ignore(end()).map(|root| Document { root })
}
