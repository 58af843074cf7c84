//! # Whitespace Token Handling
//!
//! Whitespace between tags is preserved as tokens so that positions stay exact.
//!
//! * [`Token::Whitespace`]: Spaces, tabs and carriage returns
//! * [`Token::Newline`]: Line breaks (both `\n` and `\r\n`)

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map,
    error::context,
};

use super::token::{ParserResult, Token};

/// Parses a run of spaces and tabs.
///
/// # Examples
///
/// ```
/// # use embodied_bt::tokenizer::whitespace::parse_whitespace;
/// # use embodied_bt::tokenizer::token::Token;
/// let (rest, token) = parse_whitespace("  \t<root>").unwrap();
/// assert_eq!(token, Token::Whitespace("  \t".to_string()));
/// assert_eq!(rest, "<root>");
/// ```
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_whitespace(input: &str) -> ParserResult<Token> {
    context(
        "whitespace",
        map(take_while1(|c| c == ' ' || c == '\t'), |ws: &str| {
            Token::Whitespace(ws.to_string())
        }),
    )(input)
}

/// Parses a single line break.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_newline(input: &str) -> ParserResult<Token> {
    context(
        "newline",
        map(alt((tag("\r\n"), tag("\n"), tag("\r"))), |_| Token::Newline),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whitespace() {
        let (rest, token) = parse_whitespace(" \t x").unwrap();
        assert_eq!(token, Token::Whitespace(" \t ".to_string()));
        assert_eq!(rest, "x");
        assert!(parse_whitespace("x").is_err());
    }

    #[test]
    fn test_parse_newline() {
        assert_eq!(parse_newline("\n<").unwrap(), ("<", Token::Newline));
        assert_eq!(parse_newline("\r\n<").unwrap(), ("<", Token::Newline));
        assert!(parse_newline(" ").is_err());
    }
}
