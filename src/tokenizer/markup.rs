//! # Markup Token Parsing
//!
//! Lexes the tag-level structure of a plan document:
//!
//! * Open tags with attributes, e.g. `<Action ID="GRASP" obj="apple"/>`
//! * Close tags, e.g. `</Sequence>`
//! * Declarations, e.g. `<?xml version="1.0"?>` or `<!DOCTYPE ...>`
//! * Runs of stray text between tags
//!
//! Attribute values must be quoted (double or single quotes). The five predefined
//! entities (`&lt;`, `&gt;`, `&amp;`, `&quot;`, `&apos;`) are decoded in attribute
//! values and text. Once a tag name has been read, a malformed remainder is a hard
//! failure rather than a fallback to another token kind.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, map, recognize, value},
    error::context,
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
};

use super::token::{ParserResult, Token};

/// A `name="value"` pair inside an open tag, value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parses a tag or attribute name.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_name(input: &str) -> ParserResult<&str> {
    context(
        "name",
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')),
        )),
    )(input)
}

fn parse_quoted(input: &str) -> ParserResult<&str> {
    context(
        "quoted value",
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
    )(input)
}

/// Parses `name = "value"`.
///
/// # Examples
///
/// ```
/// # use embodied_bt::tokenizer::markup::{parse_attribute, Attribute};
/// let (_, attribute) = parse_attribute(r#"obj="apple""#).unwrap();
/// assert_eq!(attribute, Attribute::new("obj", "apple"));
/// ```
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_attribute(input: &str) -> ParserResult<Attribute> {
    context(
        "attribute",
        map(
            separated_pair(
                parse_name,
                delimited(multispace0, char('='), multispace0),
                cut(parse_quoted),
            ),
            |(name, raw): (&str, &str)| Attribute::new(name, unescape(raw)),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_open_tag(input: &str) -> ParserResult<Token> {
    context(
        "open tag",
        map(
            pair(
                preceded(char('<'), parse_name),
                cut(tuple((
                    many0(preceded(multispace1, parse_attribute)),
                    multispace0,
                    alt((value(true, tag("/>")), value(false, tag(">")))),
                ))),
            ),
            |(name, (attributes, _, self_closing))| Token::OpenTag {
                name: name.to_string(),
                attributes,
                self_closing,
            },
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_close_tag(input: &str) -> ParserResult<Token> {
    context(
        "close tag",
        map(
            delimited(
                tag("</"),
                cut(parse_name),
                cut(preceded(multispace0, char('>'))),
            ),
            |name: &str| Token::CloseTag(name.to_string()),
        ),
    )(input)
}

/// Parses `<?...?>` processing instructions and `<!...>` declarations.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_declaration(input: &str) -> ParserResult<Token> {
    context(
        "declaration",
        map(
            alt((
                delimited(tag("<?"), take_until("?>"), tag("?>")),
                delimited(tag("<!"), take_until(">"), tag(">")),
            )),
            |content: &str| Token::Declaration(content.trim().to_string()),
        ),
    )(input)
}

/// Parses a run of non-whitespace text outside any tag.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_text(input: &str) -> ParserResult<Token> {
    context(
        "text",
        map(
            take_while1(|c: char| c != '<' && !c.is_whitespace()),
            |text: &str| Token::Text(unescape(text)),
        ),
    )(input)
}

pub fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Inverse of [`unescape`] for attribute values.
pub fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_tag_with_attributes() {
        let (rest, token) =
            parse_open_tag(r#"<Action ID="GRASP" obj='apple' name="grab it"/>tail"#).unwrap();
        assert_eq!(rest, "tail");
        assert_eq!(
            token,
            Token::OpenTag {
                name: "Action".to_string(),
                attributes: vec![
                    Attribute::new("ID", "GRASP"),
                    Attribute::new("obj", "apple"),
                    Attribute::new("name", "grab it"),
                ],
                self_closing: true,
            }
        );
    }

    #[test]
    fn test_parse_open_tag_multiline() {
        let input = "<root\n    main_tree_to_execute = \"MainTree\"\n>";
        let (rest, token) = parse_open_tag(input).unwrap();
        assert_eq!(rest, "");
        match token {
            Token::OpenTag {
                name,
                attributes,
                self_closing,
            } => {
                assert_eq!(name, "root");
                assert_eq!(attributes, vec![Attribute::new("main_tree_to_execute", "MainTree")]);
                assert!(!self_closing);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_unquoted_attribute_is_failure() {
        let result = parse_open_tag("<Action ID=GRASP/>");
        assert!(matches!(result, Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_parse_close_tag() {
        let (rest, token) = parse_close_tag("</Sequence >x").unwrap();
        assert_eq!(token, Token::CloseTag("Sequence".to_string()));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_parse_declaration() {
        let (_, token) = parse_declaration(r#"<?xml version="1.0"?>"#).unwrap();
        assert_eq!(token, Token::Declaration(r#"xml version="1.0""#.to_string()));
    }

    #[test]
    fn test_parse_text_stops_at_tag() {
        let (rest, token) = parse_text("hello<root>").unwrap();
        assert_eq!(token, Token::Text("hello".to_string()));
        assert_eq!(rest, "<root>");
        assert!(parse_text("<root>").is_err());
    }

    #[test]
    fn test_entities() {
        assert_eq!(unescape("a &lt;b&gt; &amp;amp;"), "a <b> &amp;");
        assert_eq!(unescape(&escape(r#"<"x" & y>"#)), r#"<"x" & y>"#);
    }
}
