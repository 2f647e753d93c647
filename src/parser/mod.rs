//! Recursive-descent parser with Pratt-style operator precedence.
//!
//! Statement forms are dispatched on the leading token, with one exception: a struct
//! declaration (`Name -> struct { ... }`) starts with the struct's own name, so it is
//! recognised by a three-token lookahead (`Ident`, `->`, `struct`) before falling back to the
//! per-keyword dispatch - an identifier followed by `->` in any other shape is a member-access
//! expression instead. Expressions are parsed by [`Parser::parse_expression`], a
//! precedence-climbing loop seeded by [`precedence_of`]; the assignment operator `=`, the
//! struct-access arrow `->`, and postfix `++`/`--` each sit outside that loop because they are
//! structural (statement-level, or bound tighter than any binary operator) rather than generic
//! infix operators.

use crate::ast::expression::{BinaryOp, Expr, PostfixOp};
use crate::ast::statement::{FuncDecl, Param, Stmt, StructDecl};
use crate::errors::CompileError;
use crate::lexer::{Token, TokenKind};
use crate::types::Type;

/// Binary operator precedence and associativity. Assignment, struct-access (`->`), and postfix
/// `++`/`--` are handled structurally elsewhere and never reach this table.
fn precedence_of(lexeme: &str) -> Option<(u8, bool)> {
    Some(match lexeme {
        "||" => (3, false),
        "&&" => (4, false),
        "==" | "!=" => (5, false),
        "<" | ">" | "<=" | ">=" => (6, false),
        "+" | "-" => (7, false),
        "*" | "/" => (8, false),
        "^" => (12, true),
        "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" => (11, true),
        _ => return None,
    })
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

pub fn parse_program(tokens: Vec<Token>) -> Result<Vec<Stmt>, CompileError> {
    let mut parser = Parser::new(tokens);
    let mut stmts = Vec::new();
    while !parser.at_eof() {
        stmts.push(parser.parse_top_level_statement()?);
    }
    Ok(stmts)
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, pos: 0 }
    }

    fn at_eof(&self) -> bool {
        self.peek(0).kind == TokenKind::Eof
    }

    fn peek(&self, k: usize) -> &Token {
        let idx = (self.pos + k).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn cur(&self) -> &Token {
        self.peek(0)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, CompileError> {
        if self.cur().kind == kind {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_operator(&mut self, lexeme: &str) -> Result<(), CompileError> {
        if self.cur().kind == TokenKind::Operator && self.cur().lexeme == lexeme {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{lexeme}'")))
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let tok = self.cur();
        let actual = if tok.kind == TokenKind::Eof { "end of file".to_string() } else { tok.lexeme.clone() };
        CompileError::syntax(expected, actual, Some(tok.position()))
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        Ok(self.expect(TokenKind::Ident, "an identifier")?.lexeme)
    }

    // ---- statements --------------------------------------------------

    /// True when the token stream is positioned at `Ident -> struct`, the struct-declaration
    /// production - the only statement form whose leading token is not itself a distinguishing
    /// keyword, so it needs a three-token lookahead instead of a dispatch on `self.cur().kind`.
    fn at_struct_decl(&self) -> bool {
        self.cur().kind == TokenKind::Ident
            && self.peek(1).kind == TokenKind::Arrow
            && self.peek(2).kind == TokenKind::Struct
    }

    fn parse_top_level_statement(&mut self) -> Result<Stmt, CompileError> {
        if self.at_struct_decl() {
            return Ok(Stmt::StructDecl(self.parse_struct_decl()?));
        }
        match self.cur().kind {
            TokenKind::Use => self.parse_use(),
            TokenKind::Package => self.parse_package(),
            TokenKind::Func | TokenKind::Extern => Ok(Stmt::FuncDecl(self.parse_func_decl()?)),
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        if self.at_struct_decl() {
            return Ok(Stmt::StructDecl(self.parse_struct_decl()?));
        }
        match self.cur().kind {
            TokenKind::Func | TokenKind::Extern => Ok(Stmt::FuncDecl(self.parse_func_decl()?)),
            TokenKind::Var | TokenKind::Let => self.parse_var_decl(),
            TokenKind::Const => self.parse_const_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Use => self.parse_use(),
            TokenKind::Package => self.parse_package(),
            _ => self.parse_expression_or_assignment_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while self.cur().kind != TokenKind::RBrace {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let name = self.ident()?;
        let mut ty = Type::identifier(name);
        while self.cur().kind == TokenKind::Star {
            self.bump();
            ty = Type::pointer_of(ty);
        }
        Ok(ty)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while self.cur().kind != TokenKind::RParen {
            let name = self.ident()?;
            self.expect(TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            params.push(Param { ty, name });
            if self.cur().kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    /// `extern` declarations have no `func` keyword of their own (`extern Name(...) -> Ret;`);
    /// non-extern declarations are introduced by `func`.
    fn parse_func_decl(&mut self) -> Result<FuncDecl, CompileError> {
        let is_extern = self.cur().kind == TokenKind::Extern;
        if is_extern {
            self.bump();
        } else {
            self.expect(TokenKind::Func, "'func'")?;
        }
        let name = self.ident()?;
        let params = self.parse_params()?;
        let ret_type = if self.cur().kind == TokenKind::Arrow {
            self.bump();
            self.parse_type()?
        } else {
            Type::identifier("void")
        };
        let body = if is_extern {
            self.expect(TokenKind::Semicolon, "';'")?;
            Vec::new()
        } else {
            self.parse_block()?
        };
        Ok(FuncDecl {
            name,
            ret_type,
            params,
            body,
            is_extern,
            is_struct_member_resolved: false,
        })
    }

    /// `Name -> struct { field:Type; ... funcDecl* }`. Fields must precede member functions;
    /// the grammar stops accepting field declarations as soon as the first `func` is seen.
    fn parse_struct_decl(&mut self) -> Result<StructDecl, CompileError> {
        let name = self.ident()?;
        self.expect(TokenKind::Arrow, "'->'")?;
        self.expect(TokenKind::Struct, "'struct'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut member_funcs = Vec::new();
        let mut seen_func = false;
        while self.cur().kind != TokenKind::RBrace {
            if self.cur().kind == TokenKind::Func {
                seen_func = true;
                member_funcs.push(self.parse_func_decl()?);
            } else if seen_func {
                return Err(self.unexpected("a member function (fields must precede functions)"));
            } else {
                let name = self.ident()?;
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                fields.push(Param { ty, name });
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(StructDecl { name, fields, member_funcs })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, CompileError> {
        self.bump();
        let name = self.ident()?;
        self.expect(TokenKind::Colon, "':'")?;
        let ty = self.parse_type()?;
        let init = if self.cur().kind == TokenKind::Operator && self.cur().lexeme == "=" {
            self.bump();
            Some(self.parse_expression(0)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::VarDecl { name, ty, init })
    }

    fn parse_const_decl(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::Const, "'const'")?;
        let name = self.ident()?;
        self.expect(TokenKind::Colon, "':'")?;
        let ty = self.parse_type()?;
        self.expect_operator("=")?;
        let init = self.parse_expression(0)?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::ConstDecl { name, ty, init })
    }

    /// `else if` collapses to a single nested `If` inside the `else` branch, never two bodies.
    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::If, "'if'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.cur().kind == TokenKind::Else {
            self.bump();
            if self.cur().kind == TokenKind::If {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::While, "'while'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::Return, "'return'")?;
        let value = if self.cur().kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression(0)?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Return { value })
    }

    fn parse_use(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::Use, "'use'")?;
        let name = self.ident()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::Use { name })
    }

    fn parse_package(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::Package, "'package'")?;
        let name = self.ident()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::PackageDecl { name })
    }

    fn parse_expression_or_assignment_statement(&mut self) -> Result<Stmt, CompileError> {
        let lhs = self.parse_expression(0)?;
        let stmt = if self.cur().kind == TokenKind::Operator && self.cur().lexeme == "=" {
            self.bump();
            let rhs = self.parse_expression(0)?;
            Stmt::Assignment { lhs, rhs }
        } else {
            Stmt::Expression(lhs)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(stmt)
    }

    // ---- expressions ---------------------------------------------------

    fn parse_expression(&mut self, min_prec: u8) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_postfix_primary()?;
        loop {
            let lexeme = if self.cur().kind == TokenKind::Operator { self.cur().lexeme.clone() } else { break };
            let Some((prec, right_assoc)) = precedence_of(&lexeme) else { break };
            if prec < min_prec {
                break;
            }
            self.bump();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_expression(next_min)?;
            let op = BinaryOp::from_lexeme(&lexeme)
                .ok_or_else(|| CompileError::syntax("a binary operator", lexeme.clone(), Some(self.cur().position())))?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    /// Parses a primary expression followed by any chain of `->member`, `(args)` call, or
    /// postfix `++`/`--` - these bind tighter than any generic binary operator, so they are
    /// consumed here, before the Pratt loop runs.
    fn parse_postfix_primary(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.cur().kind {
                TokenKind::Arrow => {
                    self.bump();
                    let member_name = self.ident()?;
                    expr = Expr::StructAccess { lhs: Box::new(expr), member_name };
                }
                TokenKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    while self.cur().kind != TokenKind::RParen {
                        args.push(self.parse_expression(0)?);
                        if self.cur().kind == TokenKind::Comma {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                    expr = Expr::call(expr, args);
                }
                TokenKind::Operator if self.cur().lexeme == "++" || self.cur().lexeme == "--" => {
                    let op = if self.bump().lexeme == "++" { PostfixOp::Increment } else { PostfixOp::Decrement };
                    expr = Expr::Postfix { operand: Box::new(expr), op };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.cur().kind {
            TokenKind::Int => {
                let tok = self.bump();
                let value = tok
                    .lexeme
                    .parse::<i32>()
                    .map_err(|_| CompileError::syntax("an integer literal", tok.lexeme.clone(), Some(tok.position())))?;
                Ok(Expr::IntLiteral(value))
            }
            TokenKind::Str => {
                let tok = self.bump();
                Ok(Expr::StringLiteral(tok.lexeme))
            }
            TokenKind::New => {
                self.bump();
                let type_name = self.ident()?;
                self.expect(TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                while self.cur().kind != TokenKind::RParen {
                    args.push(self.parse_expression(0)?);
                    if self.cur().kind == TokenKind::Comma {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::StructCtor { type_name, args })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident => {
                let name = self.ident()?;
                Ok(Expr::variable_use(name))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Vec<Stmt> {
        parse_program(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_hello_world() {
        let stmts = parse(r#"func main() -> int { print("Hi\n"); return 0; }"#);
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::FuncDecl(f) => {
                assert_eq!(f.name, "main");
                assert_eq!(f.body.len(), 2);
            }
            _ => panic!("expected a function declaration"),
        }
    }

    #[test]
    fn respects_operator_precedence() {
        let stmts = parse("func f() { return 1 + 2 * 3; }");
        let Stmt::FuncDecl(f) = &stmts[0] else { panic!() };
        let Stmt::Return { value: Some(expr) } = &f.body[0] else { panic!() };
        match expr {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected `1 + (2 * 3)`, got {other:?}"),
        }
    }

    #[test]
    fn else_if_nests_as_single_if() {
        let stmts = parse("func f() { if (1) { } else if (2) { } else { } }");
        let Stmt::FuncDecl(f) = &stmts[0] else { panic!() };
        let Stmt::If { else_branch, .. } = &f.body[0] else { panic!() };
        assert_eq!(else_branch.len(), 1);
        assert!(matches!(else_branch[0], Stmt::If { .. }));
    }

    #[test]
    fn struct_decl_rejects_field_after_func() {
        let err = parse_program(tokenize("P -> struct { func f() { } x:int; }").unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn struct_decl_parses_name_arrow_struct() {
        let stmts = parse("P -> struct { x:int; y:int; func ctor(v:int) -> void { this->x = v; } }");
        let Stmt::StructDecl(s) = &stmts[0] else { panic!() };
        assert_eq!(s.name, "P");
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.member_funcs[0].name, "ctor");
    }

    #[test]
    fn member_access_and_call_chain() {
        let stmts = parse("func f() { a->b(1, 2); }");
        let Stmt::FuncDecl(f) = &stmts[0] else { panic!() };
        let Stmt::Expression(expr) = &f.body[0] else { panic!() };
        match expr {
            Expr::Call { callee, args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(**callee, Expr::StructAccess { .. }));
            }
            other => panic!("expected a call through a struct access, got {other:?}"),
        }
    }
}
