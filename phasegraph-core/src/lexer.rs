//! Tokenizer for guard expressions.
//!
//! Negative numbers are lexed, not parsed: a `-` immediately followed by a
//! digit is captured into the number token. There is no escape processing
//! inside string literals.

use crate::error::CoreError;

/// Token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Bool,
    Op,
    LParen,
    RParen,
    End,
}

/// A lexed token. `pos` is the byte offset where the token starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, pos: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// Returns true if this is the operator `op`.
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }
}

const TWO_CHAR_OPS: [&str; 6] = ["&&", "||", "==", "!=", "<=", ">="];

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the next token. Once the input is exhausted every call
    /// returns an `End` token.
    pub fn next_token(&mut self) -> Result<Token, CoreError> {
        self.skip_whitespace();
        let start = self.pos;

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::End, "", start)),
        };

        if c.is_ascii_alphabetic() || c == '_' {
            self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            let text = &self.input[start..self.pos];
            let kind = if text == "true" || text == "false" {
                TokenKind::Bool
            } else {
                TokenKind::Ident
            };
            return Ok(Token::new(kind, text, start));
        }

        if c.is_ascii_digit() || (c == '-' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()))
        {
            if c == '-' {
                self.pos += 1;
            }
            self.lex_number_body();
            return Ok(Token::new(
                TokenKind::Number,
                &self.input[start..self.pos],
                start,
            ));
        }

        if c == '"' {
            self.pos += 1;
            let body_start = self.pos;
            return match self.input[body_start..].find('"') {
                Some(len) => {
                    self.pos = body_start + len + 1;
                    Ok(Token::new(
                        TokenKind::Str,
                        &self.input[body_start..body_start + len],
                        start,
                    ))
                }
                None => Err(CoreError::invalid_expression(format!(
                    "unterminated string literal at position {}",
                    start
                ))),
            };
        }

        if let Some(op) = TWO_CHAR_OPS.iter().find(|op| self.peek_str(op)) {
            self.pos += 2;
            return Ok(Token::new(TokenKind::Op, *op, start));
        }

        let kind = match c {
            '<' | '>' | '!' => TokenKind::Op,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => {
                return Err(CoreError::invalid_expression(format!(
                    "unexpected character '{}' at position {}",
                    c, start
                )))
            }
        };
        self.pos += 1;
        Ok(Token::new(kind, c.to_string(), start))
    }

    /// Digits with at most one dot. A trailing dot is allowed, so `5.`
    /// lexes as a number.
    fn lex_number_body(&mut self) {
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.pos += 1;
            self.eat_while(|c| c.is_ascii_digit());
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }
}

/// Tokenizes a whole input, including the trailing `End` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn single(input: &str) -> (TokenKind, String) {
        let tokens = kinds_and_text(input);
        assert_eq!(tokens.len(), 2, "expected one token for {:?}", input);
        assert_eq!(tokens[1].0, TokenKind::End);
        tokens[0].clone()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(single("true"), (TokenKind::Bool, "true".to_string()));
        assert_eq!(single("false"), (TokenKind::Bool, "false".to_string()));
        assert_eq!(single("123"), (TokenKind::Number, "123".to_string()));
        assert_eq!(single("45.67"), (TokenKind::Number, "45.67".to_string()));
        assert_eq!(single("variable"), (TokenKind::Ident, "variable".to_string()));
        assert_eq!(
            single("properties.health"),
            (TokenKind::Ident, "properties.health".to_string())
        );
        assert_eq!(single("_hidden1"), (TokenKind::Ident, "_hidden1".to_string()));
    }

    #[test]
    fn test_negative_numbers() {
        for text in ["-1", "-42", "-3.14", "-0", "-123.456"] {
            assert_eq!(single(text), (TokenKind::Number, text.to_string()));
        }
    }

    #[test]
    fn test_minus_without_digit_is_rejected() {
        assert!(tokenize("- 1").is_err());
        assert!(tokenize("x - y").is_err());
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(single("\"hello\""), (TokenKind::Str, "hello".to_string()));
        assert_eq!(
            single("\"hello world\""),
            (TokenKind::Str, "hello world".to_string())
        );
        assert_eq!(single("\"\""), (TokenKind::Str, String::new()));
        // No escape processing: the backslash is kept verbatim.
        assert_eq!(single("\"a\\b\""), (TokenKind::Str, "a\\b".to_string()));
    }

    #[test]
    fn test_operators() {
        for op in ["&&", "||", "==", "!=", "<=", ">=", "<", ">", "!"] {
            assert_eq!(single(op), (TokenKind::Op, op.to_string()));
        }
    }

    #[test]
    fn test_two_char_operators_win_over_prefix() {
        let tokens = kinds_and_text("a<=b");
        assert_eq!(tokens[1], (TokenKind::Op, "<=".to_string()));

        let tokens = kinds_and_text("!!a");
        assert_eq!(tokens[0], (TokenKind::Op, "!".to_string()));
        assert_eq!(tokens[1], (TokenKind::Op, "!".to_string()));

        let tokens = kinds_and_text("a!=b");
        assert_eq!(tokens[1], (TokenKind::Op, "!=".to_string()));
    }

    #[test]
    fn test_parentheses() {
        let tokens = kinds_and_text("()");
        assert_eq!(tokens[0].0, TokenKind::LParen);
        assert_eq!(tokens[1].0, TokenKind::RParen);
        assert_eq!(tokens[2].0, TokenKind::End);
    }

    #[test]
    fn test_complex_expression() {
        let tokens = kinds_and_text("x > 5 && properties.active");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Ident, "x".to_string()),
                (TokenKind::Op, ">".to_string()),
                (TokenKind::Number, "5".to_string()),
                (TokenKind::Op, "&&".to_string()),
                (TokenKind::Ident, "properties.active".to_string()),
                (TokenKind::End, String::new()),
            ]
        );
    }

    #[test]
    fn test_whitespace_and_positions() {
        let tokens = tokenize("  x   >   5  ").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].pos, 2);
        assert_eq!(tokens[1].pos, 6);
        assert_eq!(tokens[2].pos, 10);
    }

    #[test]
    fn test_trailing_dot_number() {
        assert_eq!(single("5."), (TokenKind::Number, "5.".to_string()));
        assert_eq!(single("-5."), (TokenKind::Number, "-5.".to_string()));

        let tokens = kinds_and_text("x>=5.");
        assert_eq!(tokens[2], (TokenKind::Number, "5.".to_string()));

        // only one dot belongs to a number
        assert!(tokenize("1.2.3").is_err());
    }

    #[test]
    fn test_comparison_against_negative_literal() {
        let tokens = kinds_and_text("x>-1");
        assert_eq!(tokens[1], (TokenKind::Op, ">".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, "-1".to_string()));
    }

    #[test]
    fn test_error_cases() {
        let err = tokenize("\"unterminated").unwrap_err();
        assert!(err.to_string().contains("unterminated string"));

        let err = tokenize("@").unwrap_err();
        assert!(err.to_string().contains("unexpected character '@'"));

        assert!(tokenize("a & b").is_err());
        assert!(tokenize("a = b").is_err());
    }

    #[test]
    fn test_end_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }
}
