//! Markup tree parser.
//!
//! Consumes the filtered token stream and builds an [`Element`] tree, reporting
//! unclosed and mismatched tags with the position of the offending token.

use super::super::{core::*, prelude::*};
use crate::tokenizer::{
    markup::Attribute,
    token::{Span, Token, TokenSpan},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Markup>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    Text { content: String, span: Span },
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Markup::Element(element) => Some(element),
            Markup::Text { .. } => None,
        })
    }

    pub fn first_text(&self) -> Option<(&str, &Span)> {
        self.children.iter().find_map(|child| match child {
            Markup::Text { content, span } => Some((content.as_str(), span)),
            Markup::Element(_) => None,
        })
    }
}

struct OpenTag {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    span: Span,
}

fn parse_open_tag() -> impl Parser<TokenSpan, OpenTag> {
    satisfy(|span: &TokenSpan| match &span.token {
        Token::OpenTag {
            name,
            attributes,
            self_closing,
        } => Some(OpenTag {
            name: name.clone(),
            attributes: attributes.clone(),
            self_closing: *self_closing,
            span: span.span(),
        }),
        _ => None,
    })
}

fn parse_declaration() -> impl Parser<TokenSpan, ()> {
    as_unit(satisfy(|span: &TokenSpan| match &span.token {
        Token::Declaration(content) => Some(content.clone()),
        _ => None,
    }))
}

/// Parses a whole document: optional declarations followed by one element.
pub fn parse_document() -> impl Parser<TokenSpan, Element> {
    with_context(
        preceded(as_unit(many(parse_declaration())), parse_element()),
        "document",
    )
}

pub fn parse_element() -> ElementParser {
    ElementParser
}

/// Recursive element parser. Nested failures propagate unchanged so that the
/// innermost unclosed or mismatched tag is the one reported.
#[derive(Clone, Copy)]
pub struct ElementParser;

impl Parser<TokenSpan, Element> for ElementParser {
    #[tracing::instrument(level = "debug", skip(self, input))]
    fn parse(&self, input: &[TokenSpan], pos: usize) -> ParseResult<Element> {
        let (mut pos, open) = match parse_open_tag().parse(input, pos) {
            Ok(result) => result,
            Err(ParseError::EOF) => return Err(ParseError::UnexpectedEOF),
            Err(_) => {
                let found = &input[pos];
                return Err(ParseError::ParseError {
                    message: "expected an element".to_string(),
                    found: found.token.to_string(),
                    span: found.span(),
                });
            }
        };

        let mut element = Element {
            name: open.name,
            attributes: open.attributes,
            children: Vec::new(),
            span: open.span,
        };
        if open.self_closing {
            return Ok((pos, element));
        }

        loop {
            let Some(current) = input.get(pos) else {
                return Err(ParseError::UnclosedTag {
                    name: element.name,
                    span: element.span,
                });
            };
            match &current.token {
                Token::CloseTag(name) if *name == element.name => {
                    return Ok((pos + 1, element));
                }
                Token::CloseTag(name) => {
                    return Err(ParseError::MismatchedTag {
                        expected: element.name,
                        found: name.clone(),
                        span: current.span(),
                    });
                }
                Token::OpenTag { .. } => {
                    let (next, child) = self.parse(input, pos)?;
                    element.children.push(Markup::Element(child));
                    pos = next;
                }
                Token::Text(content) => {
                    element.children.push(Markup::Text {
                        content: content.clone(),
                        span: current.span(),
                    });
                    pos += 1;
                }
                other => {
                    return Err(ParseError::ParseError {
                        message: format!("unexpected token inside <{}>", element.name),
                        found: other.to_string(),
                        span: current.span(),
                    });
                }
            }
        }
    }
}
