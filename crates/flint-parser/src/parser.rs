//! Flint parser: recursive descent at the statement level, precedence
//! climbing for expressions, with scope validation interleaved into the
//! parse.
//!
//! Scoping is deliberately flat: one set of known variable names and one set
//! of known function names, mutated as tokens are consumed. `let` inserts
//! its name only after the initializer has been parsed, `define` inserts the
//! function name before its body (so recursion resolves) and removes its
//! parameters from the variable set afterwards. Shadowing is not supported.

use std::collections::HashSet;

use flint_syntax::ast::*;
use flint_syntax::error::{Category, Error, Result};
use flint_syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    vars: HashSet<String>,
    funcs: HashSet<String>,
    // true inside a function body or value block; propagates into nested
    // statement blocks
    returns_allowed: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            vars: HashSet::new(),
            funcs: HashSet::new(),
            returns_allowed: false,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn unexpected_end<T>(&self, expected: &str) -> Result<T> {
        let msg = format!("Unexpected end of input, expected {expected}");
        Err(match self.tokens.last() {
            Some(t) => Error::syntax(msg, t.line, t.col),
            None => Error {
                category: Category::Syntax,
                msg,
                span: None,
            },
        })
    }

    /// Consume a payload-free token of the given kind or fail with an
    /// expected-vs-actual diagnostic.
    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let Some(t) = self.peek() else {
            return self.unexpected_end(&kind.describe());
        };
        if t.kind == kind {
            let t = t.clone();
            self.pos += 1;
            Ok(t)
        } else {
            Err(Error::syntax(
                format!("Expected {}, found {}", kind.describe(), t.kind.describe()),
                t.line,
                t.col,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize, usize)> {
        let Some(t) = self.peek() else {
            return self.unexpected_end("an identifier");
        };
        if let TokenKind::Ident(name) = &t.kind {
            let out = (name.clone(), t.line, t.col);
            self.pos += 1;
            Ok(out)
        } else {
            Err(Error::syntax(
                format!("Expected an identifier, found {}", t.kind.describe()),
                t.line,
                t.col,
            ))
        }
    }

    /// Parse a whole token stream into a program.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_statement()?);
        }
        Ok(Program { stmts })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let Some(t) = self.peek() else {
            return self.unexpected_end("a statement");
        };
        match &t.kind {
            TokenKind::Exit => self.parse_exit(),
            TokenKind::Let => Ok(Stmt::Let(self.parse_let()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Define => self.parse_define(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => {
                let block = self.parse_block(self.returns_allowed)?;
                Ok(Stmt::Block(block))
            }
            TokenKind::Ident(_) => {
                if matches!(self.peek_nth(1).map(|t| &t.kind), Some(TokenKind::LParen)) {
                    // call statement
                    let (name, line, col) = self.expect_ident()?;
                    let call = self.parse_call(name, line, col)?;
                    self.expect(TokenKind::Eos)?;
                    Ok(Stmt::Expr(call))
                } else {
                    Ok(Stmt::Assign(self.parse_assign()?))
                }
            }
            other => Err(Error::syntax(
                format!("Unexpected {} at the start of a statement", other.describe()),
                t.line,
                t.col,
            )),
        }
    }

    fn parse_exit(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Exit)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Eos)?;
        Ok(Stmt::Exit(value))
    }

    fn parse_let(&mut self) -> Result<LetStmt> {
        self.expect(TokenKind::Let)?;
        let (name, _, _) = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let init = self.parse_expr()?;
        self.expect(TokenKind::Eos)?;
        // the name becomes visible only after its initializer, so
        // `let x = x;` is a use-before-declare error
        self.vars.insert(name.clone());
        Ok(LetStmt { name, init })
    }

    fn parse_assign(&mut self) -> Result<AssignStmt> {
        let (name, line, col) = self.expect_ident()?;
        if !self.vars.contains(&name) {
            return Err(Error::name(format!("Undeclared variable '{name}'"), line, col));
        }
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Eos)?;
        Ok(AssignStmt { name, value })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_block = self.parse_block(self.returns_allowed)?;
        let else_block = if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Else)) {
            self.expect(TokenKind::Else)?;
            Some(self.parse_block(self.returns_allowed)?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block(self.returns_allowed)?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        let init = self.parse_let()?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Eos)?;
        // the step is an ordinary assignment, so its trailing ';' closes
        // the header: `for (let i = 0; i < n; i = i + 1;)`
        let step = self.parse_assign()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block(self.returns_allowed)?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_define(&mut self) -> Result<Stmt> {
        let define_tok = self.expect(TokenKind::Define)?;
        let (name, _, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            let (param, _, _) = self.expect_ident()?;
            params.push(param);
            if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                self.expect(TokenKind::Eos)?;
            }
        }
        self.expect(TokenKind::RParen)?;

        // visible before the body so the function can call itself
        self.funcs.insert(name.clone());
        for p in &params {
            self.vars.insert(p.clone());
        }
        let body = self.parse_block(true)?;
        for p in &params {
            self.vars.remove(p);
        }
        if !block_contains_return(&body) {
            return Err(Error::name(
                format!("Function '{name}' must contain at least one 'return'"),
                define_tok.line,
                define_tok.col,
            ));
        }
        Ok(Stmt::Function(Function { name, params, body }))
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let tok = self.expect(TokenKind::Return)?;
        if !self.returns_allowed {
            return Err(Error::name(
                "A 'return' is only allowed inside a function body or a value block",
                tok.line,
                tok.col,
            ));
        }
        let value = self.parse_expr()?;
        self.expect(TokenKind::Eos)?;
        Ok(Stmt::Return(value))
    }

    fn parse_block(&mut self, returning: bool) -> Result<Block> {
        self.expect(TokenKind::LBrace)?;
        let prev = self.returns_allowed;
        self.returns_allowed = returning;
        let mut stmts = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                None => return self.unexpected_end("'}'"),
                Some(TokenKind::RBrace) => break,
                Some(_) => stmts.push(self.parse_statement()?),
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.returns_allowed = prev;
        Ok(Block { stmts })
    }

    /// Parse a single expression.
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            let Some(t) = self.peek() else { break };
            let Some((op, prec)) = binary_op(&t.kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // prec + 1 makes every operator left-associative
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(t) = self.peek() else {
            return self.unexpected_end("an expression");
        };
        let (line, col) = (t.line, t.col);
        match t.kind.clone() {
            TokenKind::Int(value) => {
                self.pos += 1;
                Ok(Expr::IntLit(value))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.parse_call(name, line, col)
                } else {
                    if !self.vars.contains(&name) {
                        return Err(Error::name(
                            format!("Undeclared variable '{name}'"),
                            line,
                            col,
                        ));
                    }
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_binary(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBrace => {
                let block = self.parse_block(true)?;
                if !block_contains_return(&block) {
                    return Err(Error::name(
                        "A value block must contain a 'return'",
                        line,
                        col,
                    ));
                }
                Ok(Expr::BlockExpr(block))
            }
            other => Err(Error::syntax(
                format!("Unexpected {} in an expression", other.describe()),
                line,
                col,
            )),
        }
    }

    fn parse_call(&mut self, name: String, line: usize, col: usize) -> Result<Expr> {
        if !self.funcs.contains(&name) {
            return Err(Error::name(format!("Undefined function '{name}'"), line, col));
        }
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            loop {
                args.push(self.parse_binary(0)?);
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eos)) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call { name, args })
    }
}

fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8)> {
    match kind {
        TokenKind::Star => Some((BinOp::Mul, 5)),
        TokenKind::Percent => Some((BinOp::Mod, 5)),
        TokenKind::Plus => Some((BinOp::Add, 4)),
        TokenKind::Minus => Some((BinOp::Sub, 4)),
        TokenKind::Less => Some((BinOp::Lt, 3)),
        TokenKind::Greater => Some((BinOp::Gt, 3)),
        TokenKind::EqEq => Some((BinOp::Eq, 3)),
        _ => None,
    }
}

/// Whether a block contains a `return` in statement position, looking
/// through nested control-flow blocks but not into nested functions or
/// nested expressions.
fn block_contains_return(block: &Block) -> bool {
    block.stmts.iter().any(stmt_contains_return)
}

fn stmt_contains_return(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If {
            then_block,
            else_block,
            ..
        } => {
            block_contains_return(then_block)
                || else_block.as_ref().map_or(false, block_contains_return)
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } => block_contains_return(body),
        Stmt::Block(inner) => block_contains_return(inner),
        _ => false,
    }
}
