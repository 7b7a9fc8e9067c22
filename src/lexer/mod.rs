//! Lexical analysis for Ash.
//!
//! The lexer walks a [`CharStream`](stream::CharStream) and dispatches on
//! the first character of every lexeme into one rule per token shape.
//! Whitespace and `//` comments are consumed and discarded; everything else
//! must form a token or the whole lex fails.

mod stream;
mod token;

pub use token::*;

use std::{error::Error, fmt::Display};

use stream::CharStream;

const WHITESPACE: &str = r"[ \t\r\n\x08]";
const DIGIT: &str = "[0-9]";
const SIGN: &str = r"[+\-]";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LexError(pub String);

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for LexError {}

pub struct Lexer {
    tokens: Vec<Token>,
    stream: CharStream,
}

impl Lexer {
    pub fn new(input: &str) -> Lexer {
        Lexer {
            tokens: vec![],
            stream: CharStream::new(input),
        }
    }

    /// Lex the entire input. Any unrecognized input fails the whole call;
    /// there is no recovery or skipping.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        while self.stream.has() {
            if self.stream.take(&[WHITESPACE]) {
                self.stream.emit();
            } else if self.stream.peek(&["/", "/"]) {
                self.lex_comment();
            } else {
                let token = self.lex_token()?;
                self.tokens.push(token);
            }
        }

        Ok(self.tokens)
    }

    fn lex_token(&mut self) -> LexResult<Token> {
        if self.stream.peek(&["[A-Za-z_]"]) {
            Ok(self.lex_identifier())
        } else if self.stream.peek(&[DIGIT]) || self.stream.peek(&[SIGN, DIGIT]) {
            Ok(self.lex_number())
        } else if self.stream.peek(&["'"]) {
            self.lex_character()
        } else if self.stream.peek(&["\""]) {
            self.lex_string()
        } else {
            self.lex_operator()
        }
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        Token::new(kind, self.stream.emit())
    }

    fn error(&self, message: &str) -> LexError {
        LexError(format!(
            "{message} at position {}; remaining '{}'",
            self.stream.index(),
            self.stream.remaining()
        ))
    }

    /// `//` up to and including the line break.
    fn lex_comment(&mut self) {
        self.stream.take(&["/", "/"]);
        while self.stream.take(&[r"[^\r\n]"]) {}
        self.stream.take(&[r"[\r\n]"]);
        self.stream.emit();
    }

    /// `[A-Za-z_][A-Za-z0-9_-]*`. The `-` after the first character is part
    /// of the surface syntax, so `a-b` is a single identifier.
    fn lex_identifier(&mut self) -> Token {
        self.stream.take(&["[A-Za-z_]"]);
        while self.stream.take(&[r"[A-Za-z0-9_\-]"]) {}
        self.emit(TokenKind::Identifier)
    }

    /// Signed digits with optional fraction and exponent. The sign is only
    /// consumed when a digit follows; the same lookahead guards `.` and `e`
    /// so `1.x` and `1end` leave the suffix for the next token. A fraction
    /// makes the token DECIMAL; an exponent alone does not.
    fn lex_number(&mut self) -> Token {
        if self.stream.peek(&[SIGN, DIGIT]) {
            self.stream.take(&[SIGN]);
        }
        while self.stream.take(&[DIGIT]) {}

        let mut kind = TokenKind::Integer;
        if self.stream.peek(&[r"\.", DIGIT]) {
            self.stream.take(&[r"\."]);
            while self.stream.take(&[DIGIT]) {}
            kind = TokenKind::Decimal;
        }

        if self.stream.peek(&["e", SIGN, DIGIT]) {
            self.stream.take(&["e", SIGN]);
            while self.stream.take(&[DIGIT]) {}
        } else if self.stream.peek(&["e", DIGIT]) {
            self.stream.take(&["e"]);
            while self.stream.take(&[DIGIT]) {}
        }

        self.emit(kind)
    }

    /// `'`, one escape or one plain character, `'`.
    fn lex_character(&mut self) -> LexResult<Token> {
        self.stream.take(&["'"]);

        if !self.stream.take(&[r"\\", r#"[bfnrt'"\\]"#]) && !self.stream.take(&[r"[^'\\\r\n]"]) {
            return Err(self.error("invalid character literal"));
        }

        if !self.stream.take(&["'"]) {
            return Err(self.error("unterminated character literal"));
        }

        Ok(self.emit(TokenKind::Character))
    }

    /// `"`, any number of escapes or plain characters, `"`. Raw line breaks
    /// are not allowed inside the literal.
    fn lex_string(&mut self) -> LexResult<Token> {
        self.stream.take(&["\""]);

        loop {
            if self.stream.take(&[r"\\", r"[^\r\n]"]) {
                continue;
            }
            if self.stream.take(&[r#"[^"\\\r\n]"#]) {
                continue;
            }
            break;
        }

        if !self.stream.take(&["\""]) {
            return Err(self.error("unterminated string literal"));
        }

        Ok(self.emit(TokenKind::String))
    }

    /// `< > ! =` with an optional `=` appended, or any other single
    /// character that cannot start a different token.
    fn lex_operator(&mut self) -> LexResult<Token> {
        if self.stream.take(&["[<>!=]"]) {
            self.stream.take(&["="]);
            return Ok(self.emit(TokenKind::Operator));
        }

        if self.stream.take(&[r#"[^ \t\r\n\x08A-Za-z0-9_'"]"#]) {
            return Ok(self.emit(TokenKind::Operator));
        }

        Err(self.error("failed to lex"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).lex().expect("lexing failed")
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn literals(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.literal.as_str()).collect()
    }

    #[test]
    fn test_lex_identifiers() {
        let tokens = lex("foo _bar x1 a-b");

        assert_eq!(kinds(&tokens), vec![TokenKind::Identifier; 4]);
        assert_eq!(literals(&tokens), vec!["foo", "_bar", "x1", "a-b"]);
    }

    #[test]
    fn test_lex_integers() {
        let tokens = lex("0 1337 -3 +5 1e10 1e-2");

        assert_eq!(kinds(&tokens), vec![TokenKind::Integer; 6]);
        assert_eq!(literals(&tokens), vec!["0", "1337", "-3", "+5", "1e10", "1e-2"]);
    }

    #[test]
    fn test_lex_decimals() {
        let tokens = lex("1.5 -2.25 1.5e-2 3.0e7");

        assert_eq!(kinds(&tokens), vec![TokenKind::Decimal; 4]);
        assert_eq!(literals(&tokens), vec!["1.5", "-2.25", "1.5e-2", "3.0e7"]);
    }

    #[test]
    fn test_signed_number_adjacent_to_number() {
        let tokens = lex("-3 5");

        assert_eq!(literals(&tokens), vec!["-3", "5"]);
    }

    #[test]
    fn test_dangling_exponent_stays_separate() {
        let tokens = lex("1e");

        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Integer, "1"),
                Token::new(TokenKind::Identifier, "e"),
            ]
        );
    }

    #[test]
    fn test_dot_without_digit_is_property_access() {
        let tokens = lex("1.x");

        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Integer, "1"),
                Token::new(TokenKind::Operator, "."),
                Token::new(TokenKind::Identifier, "x"),
            ]
        );
    }

    #[test]
    fn test_lex_character_literals() {
        let tokens = lex(r"'a' '\n' '\''");

        assert_eq!(kinds(&tokens), vec![TokenKind::Character; 3]);
        assert_eq!(literals(&tokens), vec!["'a'", r"'\n'", r"'\''"]);
    }

    #[test]
    fn test_lex_string_literals() {
        let tokens = lex(r#""" "abc" "a\"b""#);

        assert_eq!(kinds(&tokens), vec![TokenKind::String; 3]);
        assert_eq!(literals(&tokens), vec![r#""""#, r#""abc""#, r#""a\"b""#]);
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(Lexer::new("\"abc").lex().is_err());
        assert!(Lexer::new("\"ab\nc\"").lex().is_err());
    }

    #[test]
    fn test_unterminated_character_fails() {
        assert!(Lexer::new("'a").lex().is_err());
        assert!(Lexer::new("''").lex().is_err());
    }

    #[test]
    fn test_lex_operators() {
        let tokens = lex("< <= > >= == != = ; , : . ( ) + - * /");

        assert_eq!(kinds(&tokens), vec![TokenKind::Operator; 17]);
        assert_eq!(
            literals(&tokens),
            vec![
                "<", "<=", ">", ">=", "==", "!=", "=", ";", ",", ":", ".", "(", ")", "+", "-", "*",
                "/",
            ]
        );
    }

    #[test]
    fn test_comments_are_discarded() {
        let tokens = lex("LET x = 1; // the answer\nx;");

        assert_eq!(literals(&tokens), vec!["LET", "x", "=", "1", ";", "x", ";"]);
    }

    #[test]
    fn test_literals_concatenate_to_stripped_input() {
        let input = "LET x = 1; // hi\nx + 2;";
        let tokens = lex(input);

        let rebuilt: String = tokens.iter().map(|t| t.literal.as_str()).collect();
        assert_eq!(rebuilt, "LETx=1;x+2;");
    }

    #[test]
    fn test_every_literal_is_a_substring() {
        let input = "DEF f(n: Integer): Integer DO RETURN n * 2; END";
        for token in lex(input) {
            assert!(input.contains(&token.literal), "{:?}", token);
        }
    }

    #[test]
    fn test_relexing_a_literal_preserves_its_kind() {
        for token in lex(r#"foo -3 1.5e-2 'x' "hi" <="#) {
            let again = lex(&token.literal);
            assert_eq!(again.len(), 1);
            assert_eq!(again[0], token);
        }
    }
}
