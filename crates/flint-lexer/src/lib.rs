//! Flint lexer: converts source text into tokens.
//!
//! Scanning is a single pass over the character buffer with a running
//! accumulator. Whitespace and `;` flush the accumulator (the flushed lexeme
//! is classified as a keyword, an integer or an identifier); operator and
//! punctuation characters flush it and then emit their own token. A `/>`
//! digraph starts a line comment. No end-of-file sentinel is emitted.

use flint_syntax::error::{Error, Result};
use flint_syntax::token::{Token, TokenKind};

/// Streaming character scanner that produces tokens with positions.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    acc: String,
    // position of the accumulator's first character
    acc_line: usize,
    acc_col: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            acc: String::new(),
            acc_line: 1,
            acc_col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn accumulate(&mut self, c: char, line: usize, col: usize) {
        if self.acc.is_empty() {
            self.acc_line = line;
            self.acc_col = col;
        }
        self.acc.push(c);
    }

    /// Classify and emit the pending accumulator, if any.
    fn flush(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        if self.acc.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.acc);
        let token = self.classify(&text)?;
        tokens.push(token);
        Ok(())
    }

    fn classify(&self, text: &str) -> Result<Token> {
        let line = self.acc_line;
        let col = self.acc_col;
        let first = text.chars().next().unwrap();

        if first.is_ascii_digit() {
            if !text.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::lexical(format!("Malformed integer '{text}'"), line, col));
            }
            let value: i64 = text
                .parse()
                .map_err(|_| Error::lexical(format!("Integer '{text}' out of range"), line, col))?;
            return Ok(Token {
                kind: TokenKind::Int(value),
                line,
                col,
            });
        }

        if !(first.is_ascii_alphabetic() || first == '_')
            || !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::lexical(format!("Invalid token '{text}'"), line, col));
        }

        let kind = match text {
            "exit" => TokenKind::Exit,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "let" => TokenKind::Let,
            "define" => TokenKind::Define,
            "return" => TokenKind::Return,
            _ => TokenKind::Ident(text.to_string()),
        };
        Ok(Token { kind, line, col })
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let line = self.line;
            let col = self.col;
            match self.peek() {
                None => break,
                Some('/') if self.peek_next() == Some('>') => {
                    self.flush(&mut tokens)?;
                    // consume up to, not including, the newline
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                    self.flush(&mut tokens)?;
                }
                Some(';') => {
                    self.advance();
                    self.flush(&mut tokens)?;
                    tokens.push(Token {
                        kind: TokenKind::Eos,
                        line,
                        col,
                    });
                }
                Some('=') => {
                    self.advance();
                    self.flush(&mut tokens)?;
                    let kind = if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::EqEq
                    } else {
                        TokenKind::Assign
                    };
                    tokens.push(Token { kind, line, col });
                }
                Some(c) => {
                    let kind = match c {
                        '(' => Some(TokenKind::LParen),
                        ')' => Some(TokenKind::RParen),
                        '{' => Some(TokenKind::LBrace),
                        '}' => Some(TokenKind::RBrace),
                        '*' => Some(TokenKind::Star),
                        '%' => Some(TokenKind::Percent),
                        '+' => Some(TokenKind::Plus),
                        '-' => Some(TokenKind::Minus),
                        '<' => Some(TokenKind::Less),
                        '>' => Some(TokenKind::Greater),
                        _ => None,
                    };
                    self.advance();
                    match kind {
                        Some(kind) => {
                            self.flush(&mut tokens)?;
                            tokens.push(Token { kind, line, col });
                        }
                        // anything else accumulates; classification at the
                        // next flush rejects what is not a valid lexeme
                        None => self.accumulate(c, line, col),
                    }
                }
            }
        }
        self.flush(&mut tokens)?;
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        lexer
            .tokenize()
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_err(input: &str) -> String {
        let mut lexer = Lexer::new(input);
        lexer.tokenize().expect_err("lexing should fail").msg
    }

    #[test]
    fn empty_statements() {
        assert_eq!(
            lex("; ; ;"),
            vec![TokenKind::Eos, TokenKind::Eos, TokenKind::Eos]
        );
    }

    #[test]
    fn semicolon_is_a_token_boundary() {
        assert_eq!(
            lex("a;b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Eos,
                TokenKind::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn keywords_need_exact_lexemes() {
        assert_eq!(lex("exit"), vec![TokenKind::Exit]);
        assert_eq!(lex("exits"), vec![TokenKind::Ident("exits".to_string())]);
        assert_eq!(lex("return"), vec![TokenKind::Return]);
        assert_eq!(lex("_ret9"), vec![TokenKind::Ident("_ret9".to_string())]);
    }

    #[test]
    fn equality_vs_assignment() {
        assert_eq!(
            lex("a==b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::EqEq,
                TokenKind::Ident("b".to_string()),
            ]
        );
        assert_eq!(
            lex("a=b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Assign,
                TokenKind::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn operators_flush_the_accumulator() {
        assert_eq!(
            lex("1+2*3"),
            vec![
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Int(2),
                TokenKind::Star,
                TokenKind::Int(3),
            ]
        );
        assert_eq!(
            lex("5%2"),
            vec![TokenKind::Int(5), TokenKind::Percent, TokenKind::Int(2)]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            lex("let x /> the rest is ignored; even this\n= 1;"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".to_string()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn comment_digraph_flushes_pending_lexeme() {
        assert_eq!(
            lex("abc/> tail"),
            vec![TokenKind::Ident("abc".to_string())]
        );
    }

    #[test]
    fn trailing_lexeme_is_flushed_without_eos() {
        assert_eq!(
            lex("exit 0"),
            vec![TokenKind::Exit, TokenKind::Int(0)]
        );
    }

    #[test]
    fn malformed_integer_is_fatal() {
        assert!(lex_err("12ab").contains("Malformed integer"));
    }

    #[test]
    fn unknown_character_is_fatal() {
        assert!(lex_err("let @ = 1;").contains("Invalid token"));
    }

    #[test]
    fn stray_slash_is_fatal() {
        assert!(lex_err("1 / 2").contains("Invalid token"));
    }

    #[test]
    fn positions_are_one_based() {
        let mut lexer = Lexer::new("let x = 10;\nx = x + 1;");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 5));
        assert_eq!((tokens[5].line, tokens[5].col), (2, 1));
    }

    #[test]
    fn lexing_is_deterministic() {
        let src = "define f(a; b) { return a % b; } exit f(7; 4);";
        let first = lex(src);
        let second = lex(src);
        assert_eq!(first, second);
    }
}
