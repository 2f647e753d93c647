//! A minimal token producer.
//!
//! The lexer is explicitly out of scope for this crate's core: it is treated
//! as an external collaborator, specified only at its interface (`Token { kind, lexeme, line,
//! col }`). This implementation exists only so `occ build` is an actually runnable pipeline; it
//! is intentionally plain and is not where the interesting engineering of this crate lives.

use crate::errors::{CompileError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Func,
    Extern,
    Var,
    Let,
    Const,
    Return,
    If,
    Else,
    While,
    Use,
    Package,
    New,
    Struct,
    Ident,
    Int,
    Str,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Colon,
    Comma,
    Star,
    Arrow,
    ArrowBack,
    Operator,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position { line: self.line, col: self.col }
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("func", TokenKind::Func),
    ("extern", TokenKind::Extern),
    ("var", TokenKind::Var),
    ("let", TokenKind::Let),
    ("const", TokenKind::Const),
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("use", TokenKind::Use),
    ("package", TokenKind::Package),
    ("new", TokenKind::New),
    ("struct", TokenKind::Struct),
];

/// Multi-character operator lexemes, longest first so the scanner is greedy-correct.
const OPERATORS: &[&str] = &[
    "->", "<-", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "=", "+", "-", "*", "/", "%", "<", ">", "&", "|", "^",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;

    let advance = |i: &mut usize, line: &mut usize, col: &mut usize, chars: &[char]| {
        if chars[*i] == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
        *i += 1;
    };

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            advance(&mut i, &mut line, &mut col, &chars);
            continue;
        }

        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            while i < chars.len() && chars[i] != '\n' {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            continue;
        }

        let (start_line, start_col) = (line, col);

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            let lexeme: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: TokenKind::Int, lexeme, line: start_line, col: start_col });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            let lexeme: String = chars[start..i].iter().collect();
            let kind = KEYWORDS
                .iter()
                .find(|(kw, _)| *kw == lexeme)
                .map(|(_, kind)| *kind)
                .unwrap_or(TokenKind::Ident);
            tokens.push(Token { kind, lexeme, line: start_line, col: start_col });
            continue;
        }

        if c == '"' {
            advance(&mut i, &mut line, &mut col, &chars);
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    advance(&mut i, &mut line, &mut col, &chars);
                }
                advance(&mut i, &mut line, &mut col, &chars);
            }
            if i >= chars.len() {
                return Err(CompileError::syntax(
                    "closing '\"'",
                    "end of file",
                    Some(Position { line: start_line, col: start_col }),
                ));
            }
            let lexeme: String = chars[start..i].iter().collect();
            advance(&mut i, &mut line, &mut col, &chars);
            tokens.push(Token { kind: TokenKind::Str, lexeme, line: start_line, col: start_col });
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, lexeme: "(".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, lexeme: ")".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            '{' => {
                tokens.push(Token { kind: TokenKind::LBrace, lexeme: "{".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            '}' => {
                tokens.push(Token { kind: TokenKind::RBrace, lexeme: "}".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            ';' => {
                tokens.push(Token { kind: TokenKind::Semicolon, lexeme: ";".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            ':' => {
                tokens.push(Token { kind: TokenKind::Colon, lexeme: ":".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            ',' => {
                tokens.push(Token { kind: TokenKind::Comma, lexeme: ",".into(), line, col });
                advance(&mut i, &mut line, &mut col, &chars);
                continue;
            }
            _ => {}
        }

        let remainder: String = chars[i..].iter().take(2).collect();
        if let Some(op) = OPERATORS.iter().find(|op| remainder.starts_with(*op)) {
            let kind = match *op {
                "->" => TokenKind::Arrow,
                "<-" => TokenKind::ArrowBack,
                "*" => TokenKind::Star,
                _ => TokenKind::Operator,
            };
            for _ in 0..op.len() {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            tokens.push(Token { kind, lexeme: op.to_string(), line: start_line, col: start_col });
            continue;
        }

        return Err(CompileError::syntax(
            "a valid token",
            c.to_string(),
            Some(Position { line: start_line, col: start_col }),
        ));
    }

    tokens.push(Token { kind: TokenKind::Eof, lexeme: String::new(), line, col });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_hello_world() {
        let toks = tokenize("func main() -> int { print(\"Hi\\n\"); return 0; }").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(kinds.first(), Some(&TokenKind::Func));
        assert!(toks.iter().any(|t| t.kind == TokenKind::Str));
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn distinguishes_arrow_from_minus() {
        let toks = tokenize("a->b a-b").unwrap();
        let arrow = toks.iter().find(|t| t.lexeme == "->").unwrap();
        assert_eq!(arrow.kind, TokenKind::Arrow);
        let minus = toks.iter().find(|t| t.lexeme == "-").unwrap();
        assert_eq!(minus.kind, TokenKind::Operator);
    }
}
