//! Lexer for the search query language using logos.
//!
//! The lexer only separates structure from text. Operators, boolean
//! keywords and field references are all plain [`Token::Word`]s; the parser
//! classifies them by position.

use crate::error::ParseError;
use crate::span::Span;
use logos::Logos;

/// Token types for the search language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,

    /// A quoted span, quotes included.
    #[regex(r#""[^"]*""#, |lex| lex.slice().to_string())]
    #[regex(r#"'[^']*'"#, |lex| lex.slice().to_string())]
    Quoted(String),

    /// Any run of characters that is not whitespace, a quote or structural.
    #[regex(r#"[^\s():"']+"#, |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// The source text of the token.
    pub fn as_str(&self) -> &str {
        match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Colon => ":",
            Token::Quoted(s) | Token::Word(s) => s,
        }
    }
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

impl SpannedToken {
    /// The source text of the token.
    pub fn text(&self) -> &str {
        self.token.as_str()
    }
}

/// Tokenize a query into spanned tokens.
///
/// A quote that is never closed fails the whole query, as does a query
/// that uses both quote characters anywhere.
pub fn tokenize_spanned(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            // The only input no rule accepts is an opening quote without its partner.
            Err(()) => {
                return Err(ParseError::unclosed_quotes(Span::new(
                    span.start,
                    source.len(),
                )))
            }
        }
    }

    if let (Some(single), Some(double)) = (source.find('\''), source.find('"')) {
        let pos = single.max(double);
        return Err(ParseError::mixed_quotes(Span::new(pos, pos + 1)));
    }

    tracing::trace!(count = tokens.len(), "tokenized query");
    Ok(tokens)
}

/// Tokenize a query into token strings.
///
/// # Example
///
/// ```rust
/// use catalog_query::tokenize;
///
/// let tokens = tokenize(r#"@metadata.owner:"data team""#).unwrap();
/// assert_eq!(tokens, vec!["@metadata.owner", ":", "\"data team\""]);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<String>, ParseError> {
    Ok(tokenize_spanned(source)?
        .into_iter()
        .map(|t| t.text().to_string())
        .collect())
}
