//! Code generation: lower the parsed AST into AT&T x86-64 assembly text.
//!
//! Emission is stack-machine style. Every expression leaves its result in
//! `%rax`; a binary evaluates its right operand first and parks it on the
//! stack while the left side computes. Locals live on the frame and are
//! addressed relative to `%rbp`. Control-flow labels draw from one counter
//! for the whole translation unit, so no label name is ever defined twice.

use std::collections::HashSet;

use flint_syntax::ast::*;
use flint_syntax::error::{Error, Result};

use crate::frame::Frame;

/// System V AMD64 integer argument registers, in passing order.
const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

pub struct Generator {
    asm: String,
    label_counter: usize,
    warnings: Vec<String>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            asm: String::new(),
            label_counter: 0,
            warnings: Vec::new(),
        }
    }

    /// Warnings accumulated during the last `generate` call.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Emit the whole program: `.text`, every top-level function in source
    /// order, then the `_start` entry point that calls `main` and exits
    /// with its return value.
    pub fn generate(&mut self, program: &Program) -> Result<String> {
        self.raw(".text");
        let mut defined: HashSet<&str> = HashSet::new();
        for stmt in &program.stmts {
            match stmt {
                Stmt::Function(func) => {
                    if !defined.insert(func.name.as_str()) {
                        return Err(Error::codegen(format!(
                            "Duplicate function '{}'",
                            func.name
                        )));
                    }
                    self.emit_function(func);
                }
                _ => self.warnings.push(
                    "ignoring top-level statement, only function definitions are compiled"
                        .to_string(),
                ),
            }
        }
        self.raw(".globl _start");
        self.raw("_start:");
        self.ins("call main");
        self.ins("mov %rax, %rdi");
        self.ins("mov $60, %rax");
        self.ins("syscall");
        Ok(std::mem::take(&mut self.asm))
    }

    fn raw(&mut self, line: &str) {
        self.asm.push_str(line);
        self.asm.push('\n');
    }

    fn ins(&mut self, text: &str) {
        self.asm.push_str("    ");
        self.asm.push_str(text);
        self.asm.push('\n');
    }

    fn fresh_label(&mut self) -> usize {
        let label = self.label_counter;
        self.label_counter += 1;
        label
    }

    fn emit_function(&mut self, func: &Function) {
        self.raw(&format!("{}:", func.name));
        self.ins("push %rbp");
        self.ins("mov %rsp, %rbp");

        // slots are reserved for parameters and for let statements directly
        // in the body; lets nested inside control flow bind entries without
        // reserved space
        let direct_lets = func
            .body
            .stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Let(_)))
            .count();
        let reserved = func.params.len() + direct_lets;
        if reserved > 0 {
            self.ins(&format!("sub ${}, %rsp", reserved * 8));
        }

        let mut frame = Frame::new();
        for (i, param) in func.params.iter().enumerate() {
            let offset = frame.bind(param);
            if i < ARG_REGS.len() {
                self.ins(&format!("mov {}, {}(%rbp)", ARG_REGS[i], offset));
            } else {
                // caller-pushed argument, copied down into its local slot
                self.ins(&format!("mov {}(%rbp), %rax", (i as i64 - 5) * 8));
                self.ins(&format!("mov %rax, {}(%rbp)", offset));
            }
        }

        for stmt in &func.body.stmts {
            self.emit_stmt(stmt, &mut frame);
        }
        self.emit_epilogue();
    }

    fn emit_epilogue(&mut self) {
        self.ins("mov %rbp, %rsp");
        self.ins("pop %rbp");
        self.ins("ret");
    }

    fn emit_block(&mut self, block: &Block, frame: &mut Frame) {
        for stmt in &block.stmts {
            self.emit_stmt(stmt, frame);
        }
    }

    fn emit_let(&mut self, let_stmt: &LetStmt, frame: &mut Frame) {
        self.emit_expr(&let_stmt.init, frame);
        let offset = frame.bind(&let_stmt.name);
        self.ins(&format!("mov %rax, {offset}(%rbp)"));
    }

    fn emit_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) {
        match stmt {
            Stmt::Let(let_stmt) => self.emit_let(let_stmt, frame),
            Stmt::Assign(assign) => {
                self.emit_expr(&assign.value, frame);
                let offset = frame.offset_of(&assign.name);
                self.ins(&format!("mov %rax, {offset}(%rbp)"));
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let label = self.fresh_label();
                self.emit_expr(cond, frame);
                self.ins("cmp $0, %rax");
                self.ins(&format!("je .L_else_{label}"));
                self.emit_block(then_block, frame);
                self.ins(&format!("jmp .L_endif_{label}"));
                self.raw(&format!(".L_else_{label}:"));
                if let Some(else_block) = else_block {
                    self.emit_block(else_block, frame);
                }
                self.raw(&format!(".L_endif_{label}:"));
            }
            Stmt::While { cond, body } => {
                let label = self.fresh_label();
                self.raw(&format!(".L_while_{label}:"));
                self.emit_expr(cond, frame);
                self.ins("cmp $0, %rax");
                self.ins(&format!("je .L_endwhile_{label}"));
                self.emit_block(body, frame);
                self.ins(&format!("jmp .L_while_{label}"));
                self.raw(&format!(".L_endwhile_{label}:"));
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let label = self.fresh_label();
                self.emit_let(init, frame);
                self.raw(&format!(".L_for_{label}:"));
                self.emit_expr(cond, frame);
                self.ins("cmp $0, %rax");
                self.ins(&format!("je .L_endfor_{label}"));
                self.emit_block(body, frame);
                self.emit_expr(&step.value, frame);
                let offset = frame.offset_of(&step.name);
                self.ins(&format!("mov %rax, {offset}(%rbp)"));
                self.ins(&format!("jmp .L_for_{label}"));
                self.raw(&format!(".L_endfor_{label}:"));
            }
            Stmt::Return(value) => {
                self.emit_expr(value, frame);
                self.emit_epilogue();
            }
            Stmt::Exit(value) => {
                self.emit_expr(value, frame);
                self.ins("mov %rax, %rdi");
                self.ins("mov $60, %rax");
                self.ins("syscall");
            }
            Stmt::Block(block) => self.emit_block(block, frame),
            Stmt::Expr(expr) => self.emit_expr(expr, frame),
            Stmt::Function(func) => self.warnings.push(format!(
                "ignoring definition of '{}' nested inside another function",
                func.name
            )),
        }
    }

    fn emit_expr(&mut self, expr: &Expr, frame: &mut Frame) {
        match expr {
            Expr::IntLit(value) => self.ins(&format!("mov ${value}, %rax")),
            Expr::Ident(name) => {
                let offset = frame.offset_of(name);
                self.ins(&format!("mov {offset}(%rbp), %rax"));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.emit_expr(rhs, frame);
                self.ins("push %rax");
                self.emit_expr(lhs, frame);
                self.ins("pop %rbx");
                match op {
                    BinOp::Add => self.ins("add %rbx, %rax"),
                    BinOp::Sub => self.ins("sub %rbx, %rax"),
                    BinOp::Mul => self.ins("imul %rbx"),
                    BinOp::Mod => {
                        self.ins("xor %rdx, %rdx");
                        self.ins("idiv %rbx");
                        self.ins("mov %rdx, %rax");
                    }
                    BinOp::Eq | BinOp::Lt | BinOp::Gt => {
                        self.ins("cmp %rbx, %rax");
                        let set = match op {
                            BinOp::Eq => "sete",
                            BinOp::Lt => "setl",
                            _ => "setg",
                        };
                        self.ins(&format!("{set} %al"));
                        self.ins("movzb %al, %rax");
                    }
                }
            }
            Expr::Call { name, args } => {
                // save every argument register around the call regardless
                // of arity
                for reg in ARG_REGS {
                    self.ins(&format!("push {reg}"));
                }
                for arg in args.iter().rev() {
                    self.emit_expr(arg, frame);
                    self.ins("push %rax");
                }
                for reg in ARG_REGS.iter().take(args.len()) {
                    self.ins(&format!("pop {reg}"));
                }
                self.ins(&format!("call {name}"));
                if args.len() > ARG_REGS.len() {
                    self.ins(&format!("add ${}, %rsp", (args.len() - ARG_REGS.len()) * 8));
                }
                for reg in ARG_REGS.iter().rev() {
                    self.ins(&format!("pop {reg}"));
                }
            }
            Expr::BlockExpr(block) => {
                // inline; the return inside leaves the value in %rax
                self.emit_block(block, frame);
            }
        }
    }
}
