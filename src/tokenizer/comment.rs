use nom::{
    bytes::complete::{tag, take_until},
    combinator::map,
    error::context,
    sequence::delimited,
};

use super::token::{ParserResult, Token};

/// Parses a markup comment `<!-- ... -->`, keeping its trimmed content.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_comment(input: &str) -> ParserResult<Token> {
    context(
        "comment",
        map(
            delimited(tag("<!--"), take_until("-->"), tag("-->")),
            |content: &str| Token::Comment(content.trim().to_string()),
        ),
    )(input)
}
