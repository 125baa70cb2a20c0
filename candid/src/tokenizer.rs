//! Splits Candid text into single-character punctuation tokens and text runs.
//!
//! Text runs are borrowed slices of the input; nothing is copied. Identifiers, numbers, keywords
//! and operators such as `=` or `->` all come out as [`Token::Text`].

use std::fmt;

use crate::error::LexError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Colon,
    SemiColon,
    Period,
    /// Never empty, never contains whitespace.
    Text(&'a str),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Colon,
    SemiColon,
    Period,
    Text,
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::OpenParen => TokenKind::OpenParen,
            Self::CloseParen => TokenKind::CloseParen,
            Self::OpenBrace => TokenKind::OpenBrace,
            Self::CloseBrace => TokenKind::CloseBrace,
            Self::Colon => TokenKind::Colon,
            Self::SemiColon => TokenKind::SemiColon,
            Self::Period => TokenKind::Period,
            Self::Text(_) => TokenKind::Text,
        }
    }

    pub fn text(&self) -> Option<&'a str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    fn punctuation(c: char) -> Option<Token<'static>> {
        Some(match c {
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '{' => Token::OpenBrace,
            '}' => Token::CloseBrace,
            ':' => Token::Colon,
            ';' => Token::SemiColon,
            '.' => Token::Period,
            _ => return None,
        })
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenParen => f.write_str("("),
            Self::CloseParen => f.write_str(")"),
            Self::OpenBrace => f.write_str("{"),
            Self::CloseBrace => f.write_str("}"),
            Self::Colon => f.write_str(":"),
            Self::SemiColon => f.write_str(";"),
            Self::Period => f.write_str("."),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Tokenizes `text` into a cursor positioned on the first token.
///
/// Fails if the input holds no token at all, or if a quoted run (`"..."`) reaches the end of the
/// input or whitespace before its closing quote.
pub fn tokenize(text: &str) -> Result<TokenCursor<'_>, LexError> {
    let mut tokens = Vec::new();
    let mut index = 0;
    while let Some(c) = text[index..].chars().next() {
        if c.is_whitespace() {
            index += c.len_utf8();
            continue;
        }
        if let Some(token) = Token::punctuation(c) {
            tokens.push(token);
            index += c.len_utf8();
            continue;
        }
        let end = if c == '"' {
            scan_quoted(text, index)?
        } else {
            scan_text(text, index)
        };
        // A run that ends where it starts carries no text, so no token is emitted
        if end > index {
            tokens.push(Token::Text(&text[index..end]));
        }
        index = end.max(index + c.len_utf8());
    }
    TokenCursor::new(tokens)
}

/// Returns the end (exclusive) of the unquoted text run starting at `start`.
fn scan_text(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|&(_, c)| c.is_whitespace() || Token::punctuation(c).is_some())
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len())
}

/// Returns the end (exclusive, past the closing quote) of the quoted run starting at `start`.
fn scan_quoted(text: &str, start: usize) -> Result<usize, LexError> {
    let body = start + 1;
    for (offset, c) in text[body..].char_indices() {
        if c == '"' {
            return Ok(body + offset + 1);
        }
        if c.is_whitespace() {
            return Err(LexError::WhitespaceInQuotedText { start });
        }
    }
    Err(LexError::UnterminatedText { start })
}

/// A position in a non-empty token stream.
///
/// The cursor always points at an existing token; moving past the last token fails and leaves the
/// position unchanged.
#[derive(Clone, Debug)]
pub struct TokenCursor<'a> {
    tokens: Vec<Token<'a>>,
    index: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Result<Self, LexError> {
        if tokens.is_empty() {
            return Err(LexError::EmptyInput);
        }
        Ok(Self { tokens, index: 0 })
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token<'a>> {
        self.tokens
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Token<'a> {
        self.tokens[self.index]
    }

    pub fn previous(&self) -> Option<Token<'a>> {
        self.index
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .copied()
    }

    pub fn next(&self) -> Option<Token<'a>> {
        self.tokens.get(self.index + 1).copied()
    }

    pub fn is_at_end(&self) -> bool {
        self.index + 1 == self.tokens.len()
    }

    /// Advances to the next token. Returns `false` (and stays put) on the last token.
    pub fn move_next(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn move_next_or_err(&mut self) -> Result<(), LexError> {
        if self.move_next() {
            Ok(())
        } else {
            Err(LexError::UnexpectedEnd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token<'_>> {
        tokenize(text).unwrap().into_tokens()
    }

    #[test]
    fn tokenizes_argument_list() {
        assert_eq!(
            tokens("(a: nat; b: text)"),
            vec![
                Token::OpenParen,
                Token::Text("a"),
                Token::Colon,
                Token::Text("nat"),
                Token::SemiColon,
                Token::Text("b"),
                Token::Colon,
                Token::Text("text"),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn punctuation_is_one_token_each() {
        let cases = [
            ('(', TokenKind::OpenParen),
            (')', TokenKind::CloseParen),
            ('{', TokenKind::OpenBrace),
            ('}', TokenKind::CloseBrace),
            (':', TokenKind::Colon),
            (';', TokenKind::SemiColon),
            ('.', TokenKind::Period),
        ];
        for (c, kind) in cases {
            let text = format!("  {c}\t");
            let tokens = tokens(&text);
            assert_eq!(tokens.len(), 1, "{c:?}");
            assert_eq!(tokens[0].kind(), kind);
            assert_eq!(tokens[0].to_string(), c.to_string());
        }
    }

    #[test]
    fn adjacent_punctuation_yields_no_empty_text() {
        let tokens = tokens("(){};;");
        assert_eq!(tokens.len(), 6);
        assert!(tokens.iter().all(|t| t.kind() != TokenKind::Text));
    }

    #[test]
    fn text_runs_are_never_empty_or_spaced() {
        let tokens = tokens(" type  A=nat8 ;\n service : {\r\n get : () -> (A) query ; } ");
        let texts = tokens.iter().filter_map(Token::text).collect::<Vec<_>>();
        assert_eq!(
            texts,
            vec!["type", "A=nat8", "service", "get", "->", "A", "query"]
        );
        assert!(texts
            .iter()
            .all(|t| !t.is_empty() && !t.contains(char::is_whitespace)));
    }

    #[test]
    fn text_run_at_end_of_input_is_complete() {
        assert_eq!(tokens("nat64"), vec![Token::Text("nat64")]);
        assert_eq!(
            tokens("vec nat8"),
            vec![Token::Text("vec"), Token::Text("nat8")]
        );
    }

    #[test]
    fn quoted_text_keeps_punctuation() {
        assert_eq!(
            tokens("\"http.request\" : ()"),
            vec![
                Token::Text("\"http.request\""),
                Token::Colon,
                Token::OpenParen,
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn quoted_text_failures() {
        assert_eq!(
            tokenize("a \"open").unwrap_err(),
            LexError::UnterminatedText { start: 2 }
        );
        assert_eq!(
            tokenize("\"two words\"").unwrap_err(),
            LexError::WhitespaceInQuotedText { start: 0 }
        );
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(tokenize("").unwrap_err(), LexError::EmptyInput);
        assert_eq!(tokenize(" \n\t ").unwrap_err(), LexError::EmptyInput);
        assert_eq!(TokenCursor::new(vec![]).unwrap_err(), LexError::EmptyInput);
    }

    #[test]
    fn cursor_navigation() {
        let mut cursor = tokenize("a : b").unwrap();
        assert_eq!(cursor.current(), Token::Text("a"));
        assert_eq!(cursor.previous(), None);
        assert_eq!(cursor.next(), Some(Token::Colon));

        assert!(cursor.move_next());
        assert_eq!(cursor.previous(), Some(Token::Text("a")));
        assert_eq!(cursor.current(), Token::Colon);

        cursor.move_next_or_err().unwrap();
        assert!(cursor.is_at_end());
        assert_eq!(cursor.next(), None);
        assert!(!cursor.move_next());
        assert_eq!(cursor.move_next_or_err(), Err(LexError::UnexpectedEnd));
        assert_eq!(cursor.current(), Token::Text("b"));
        assert_eq!(cursor.position(), 2);
    }
}
