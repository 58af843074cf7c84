use std::fmt;

use nom::{branch::alt, error::VerboseError, IResult};
use thiserror::Error;

use super::{
    comment::parse_comment,
    markup::{
        parse_close_tag, parse_declaration, parse_open_tag, parse_text, Attribute,
    },
    whitespace::{parse_newline, parse_whitespace},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Markup
    OpenTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    CloseTag(String),
    Declaration(String),
    Text(String),
    // Formatting
    Whitespace(String),
    Newline,
    Comment(String),
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::Comment(_))
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace(_))
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Token::Newline)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenTag {
                name, self_closing, ..
            } => {
                if *self_closing {
                    write!(f, "<{}/>", name)
                } else {
                    write!(f, "<{}>", name)
                }
            }
            Token::CloseTag(name) => write!(f, "</{}>", name),
            Token::Declaration(content) => write!(f, "declaration `{}`", content),
            Token::Text(text) => write!(f, "text `{}`", text),
            Token::Whitespace(_) => write!(f, "whitespace"),
            Token::Newline => write!(f, "newline"),
            Token::Comment(_) => write!(f, "comment"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_position: usize,
    current_line: usize,
    current_column: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current_position: 0,
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
        }
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> TokenizerResult<Vec<TokenSpan>> {
        let mut tokens = Vec::new();
        let mut remaining = input;

        while !remaining.is_empty() {
            let start_position = self.current_position;
            let start_line = self.current_line;
            let start_column = self.current_column;

            let result = alt((
                // Formatting
                parse_whitespace,
                parse_newline,
                // Markup, most specific prefix first
                parse_comment,
                parse_declaration,
                parse_close_tag,
                parse_open_tag,
                parse_text,
            ))(remaining);

            match result {
                Ok((new_remaining, token)) => {
                    let consumed = &remaining[..(remaining.len() - new_remaining.len())];
                    self.update_position(consumed);

                    tokens.push(TokenSpan {
                        token,
                        start: start_position,
                        end: self.current_position,
                        line: start_line,
                        column: start_column,
                    });

                    remaining = new_remaining;
                }
                Err(e) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let span = Span {
                        start: self.current_position,
                        end: self.current_position + 1,
                        line: self.current_line,
                        column: self.current_column,
                    };
                    let error = match e {
                        nom::Err::Incomplete(e) => TokenizerError::ParseError {
                            message: format!("Incomplete input, {:?}", e),
                            found,
                            span,
                        },
                        nom::Err::Error(e) | nom::Err::Failure(e) => TokenizerError::ParseError {
                            message: nom::error::convert_error(remaining, e),
                            found,
                            span,
                        },
                    };
                    tracing::error!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            self.current_position += c.len_utf8();
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl TokenSpan {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizerError {
    #[error("Tokenize error at {span}: {message} (found `{found}`)")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
}
