//! Generación de código.
//!
//! Recorrido del AST que emite ensamblador de texto directamente, sin
//! representación intermedia. Cada nodo de expresión adquiere su registro
//! de resultado antes de evaluar a sus hijos, y libera los registros de
//! sus operandos tras la instrucción que los combina.
//!
//! # Stack frame
//! El frame tiene un tamaño fijo. Las variables declaradas en el nivel
//! superior de una función reciben ranura en una pasada previa, que además
//! emite el almacenamiento de su inicializador antes de cualquier sentencia.
//! Las declaraciones en bloques anidados reciben ranura en el punto en que
//! aparecen, dentro de un scope propio.

use crate::{
    arch::{
        riscv::{self, Reg},
        Register,
    },
    ast::{
        BinOp, BlockItem, Declaration, Expr, ExternalDecl, Function, Identifier, PostfixOp,
        Program, Statement, UnaryOp,
    },
    source::{Located, Location},
    table::Table,
};

use log::{debug, trace};
use std::fmt;
use thiserror::Error;

use self::regs::{Allocator, Stack};

pub mod regs;

/// Parámetros de generación de código.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Máximo de registros temporales simultáneos, `a1` hasta `aN`.
    pub registers: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options { registers: 99 }
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Undefined variable `{0}`")]
    Undefined(Identifier),

    #[error("Too many registers in use")]
    TooManyRegisters,

    #[error("Stack frame exhausted, at most {} local variables are supported", riscv::SLOTS)]
    FrameExhausted,

    #[error("Redefinition of `{0}` in the same scope")]
    Redefinition(Identifier),

    #[error("Expression is not assignable")]
    NotAssignable,

    #[error("Code generation for {0} is not supported")]
    Unsupported(&'static str),
}

/// Genera el listado ensamblador de un programa completo.
pub fn generate(program: &Program, options: &Options) -> Result<String, Located<CodegenError>> {
    let mut generator = Generator::new(options);

    for declaration in program.declarations() {
        match declaration {
            ExternalDecl::Function(function) => generator.function(function)?,
            ExternalDecl::Declaration(declaration) => {
                return Err(Located::at(
                    CodegenError::Unsupported("file-scope variables"),
                    declaration.name.location().clone(),
                ))
            }
        }
    }

    Ok(generator.output)
}

/// Entrada de la tabla de símbolos para una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    /// Ranura en el stack frame, relativa a `s0`.
    pub offset: i32,
}

type Gen<T> = Result<T, Located<CodegenError>>;

/// Estado de emisión, compartido por todas las funciones del programa.
struct Generator {
    output: String,
    regs: Stack<Reg>,
    scope: Table<Symbol>,
    outer: Vec<Table<Symbol>>,
    slots: u32,
    labels: u32,
    functions: u32,
    epilogue: String,
}

impl Generator {
    fn new(options: &Options) -> Self {
        Generator {
            output: String::new(),
            regs: Stack::new(options.registers),
            scope: Table::new(),
            outer: Vec::new(),
            slots: 0,
            labels: 0,
            functions: 0,
            epilogue: String::new(),
        }
    }

    fn function(&mut self, function: &Function) -> Gen<()> {
        let name = function.name.val();

        self.epilogue = match self.functions {
            0 => String::from(".Lend"),
            n => format!(".Lend{}", n),
        };

        self.functions += 1;
        self.scope = Table::new();
        self.outer.clear();
        self.slots = 0;

        if !self.output.is_empty() {
            self.line(format_args!(""));
        }

        self.line(format_args!("  .globl {}", name));
        self.label(name.as_str());

        emit!(self, "addi", "{},{},{}", Reg::Sp, Reg::Sp, -riscv::FRAME_SIZE);
        emit!(self, "sd", "{},{}({})", Reg::S0, riscv::FRAME_SIZE / 2, Reg::Sp);
        emit!(self, "addi", "{},{},{}", Reg::S0, Reg::Sp, riscv::FRAME_SIZE);

        for item in &function.body {
            if let BlockItem::Declaration(declaration) = item {
                self.declare(declaration)?;
            }
        }

        for item in &function.body {
            if let BlockItem::Statement(statement) = item {
                self.statement(statement)?;
            }
        }

        let epilogue = self.epilogue.clone();
        self.label(&epilogue);

        emit!(self, "ld", "{},{}({})", Reg::S0, riscv::FRAME_SIZE / 2, Reg::Sp);
        emit!(self, "addi", "{},{},{}", Reg::Sp, Reg::Sp, riscv::FRAME_SIZE);
        emit!(self, "jr", "{}", Reg::Ra);

        debug_assert_eq!(self.regs.in_use(), 0);
        debug!("emitted function `{}` with {} stack slots", name, self.slots);

        Ok(())
    }

    /// Asigna ranura a una variable y almacena su inicializador, si existe.
    fn declare(&mut self, declaration: &Declaration) -> Gen<()> {
        let name = &declaration.name;
        if self.slots >= riscv::SLOTS {
            return Err(Located::at(CodegenError::FrameExhausted, name.location().clone()));
        }

        let symbol = Symbol {
            offset: riscv::slot_offset(self.slots),
        };

        if self.scope.set(name.val().as_str(), symbol).is_some() {
            let error = CodegenError::Redefinition(name.val().clone());
            return Err(Located::at(error, name.location().clone()));
        }

        self.slots += 1;
        trace!("slot {}({}) for `{}`", symbol.offset, Reg::S0, name.val());

        if let Some(init) = &declaration.init {
            let value = self.expr(init)?;
            emit!(self, "sw", "{},{}({})", value, symbol.offset, Reg::S0);
            self.regs.release(value);
        }

        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Gen<()> {
        match statement {
            Statement::Expr(expr) => {
                let value = self.expr(expr)?;
                self.regs.release(value);
            }

            Statement::Return(value) => {
                if let Some(expr) = value {
                    let value = self.expr(expr)?;
                    emit!(self, "mv", "{},{}", Reg::RETURN, value);
                    self.regs.release(value);
                }

                let epilogue = self.epilogue.clone();
                emit!(self, "j", "{}", epilogue);
            }

            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                let label = self.next_label();

                let value = self.expr(condition)?;
                match otherwise {
                    None => {
                        emit!(self, "beqz", "{},.L{}end", value, label);
                        self.regs.release(value);

                        self.statement(then)?;
                    }

                    Some(otherwise) => {
                        emit!(self, "beqz", "{},.L{}else", value, label);
                        self.regs.release(value);

                        self.statement(then)?;
                        emit!(self, "j", ".L{}end", label);

                        self.label(&format!(".L{}else", label));
                        self.statement(otherwise)?;
                    }
                }

                self.label(&format!(".L{}end", label));
            }

            Statement::Compound(items) => {
                let enclosing = std::mem::take(&mut self.scope);
                self.outer.push(enclosing);

                for item in items {
                    match item {
                        BlockItem::Declaration(declaration) => self.declare(declaration)?,
                        BlockItem::Statement(statement) => self.statement(statement)?,
                    }
                }

                if let Some(enclosing) = self.outer.pop() {
                    self.scope = enclosing;
                }
            }
        }

        Ok(())
    }

    /// Evalúa una expresión; el registro resultante queda a cargo del llamador.
    fn expr(&mut self, expr: &Located<Expr>) -> Gen<Reg> {
        let location = expr.location();
        let rg = self
            .regs
            .acquire()
            .map_err(|error| Located::at(error, location.clone()))?;

        match expr.val() {
            Expr::Integer(value) => emit!(self, "li", "{},{}", rg, value),

            Expr::Variable(id) => {
                let offset = self.lookup(id, location)?;
                emit!(self, "lw", "{},{}({})", rg, offset, Reg::S0);
            }

            Expr::Assign(lhs, rhs) => {
                let offset = self.lvalue(lhs)?;
                let value = self.expr(rhs)?;

                emit!(self, "sw", "{},{}({})", value, offset, Reg::S0);
                emit!(self, "mv", "{},{}", rg, value);
                self.regs.release(value);
            }

            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;

                self.binary(*op, rg, lhs, rhs);

                self.regs.release(rhs);
                self.regs.release(lhs);
            }

            Expr::Unary(op, operand) => self.unary(*op, rg, operand)?,

            Expr::Postfix(op, operand) => {
                let offset = self.lvalue(operand)?;
                let step = match op {
                    PostfixOp::Increment => 1,
                    PostfixOp::Decrement => -1,
                };

                let updated = self
                    .regs
                    .acquire()
                    .map_err(|error| Located::at(error, location.clone()))?;

                emit!(self, "lw", "{},{}({})", rg, offset, Reg::S0);
                emit!(self, "addi", "{},{},{}", updated, rg, step);
                emit!(self, "sw", "{},{}({})", updated, offset, Reg::S0);
                self.regs.release(updated);
            }

            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let label = self.next_label();

                let value = self.expr(condition)?;
                emit!(self, "beqz", "{},.L{}else", value, label);
                self.regs.release(value);

                let value = self.expr(then)?;
                emit!(self, "mv", "{},{}", rg, value);
                self.regs.release(value);
                emit!(self, "j", ".L{}end", label);

                self.label(&format!(".L{}else", label));
                let value = self.expr(otherwise)?;
                emit!(self, "mv", "{},{}", rg, value);
                self.regs.release(value);

                self.label(&format!(".L{}end", label));
            }

            Expr::Comma(lhs, rhs) => {
                let discarded = self.expr(lhs)?;
                self.regs.release(discarded);

                let value = self.expr(rhs)?;
                emit!(self, "mv", "{},{}", rg, value);
                self.regs.release(value);
            }

            Expr::Call(..) => return unsupported("function calls", location),
            Expr::Index(..) => return unsupported("array indexing", location),
            Expr::Member { .. } => return unsupported("member access", location),
        }

        Ok(rg)
    }

    /// Los operadores lógicos no se evalúan en cortocircuito.
    fn binary(&mut self, op: BinOp, rg: Reg, lhs: Reg, rhs: Reg) {
        use BinOp::*;

        match op {
            Add => emit!(self, "add", "{},{},{}", rg, lhs, rhs),
            Sub => emit!(self, "sub", "{},{},{}", rg, lhs, rhs),
            Mul => emit!(self, "mul", "{},{},{}", rg, lhs, rhs),
            Div => emit!(self, "div", "{},{},{}", rg, lhs, rhs),
            Mod => emit!(self, "rem", "{},{},{}", rg, lhs, rhs),

            Greater => emit!(self, "slt", "{},{},{}", rg, rhs, lhs),
            Less => emit!(self, "slt", "{},{},{}", rg, lhs, rhs),

            LessOrEqual => {
                emit!(self, "slt", "{},{},{}", rg, rhs, lhs);
                emit!(self, "xori", "{},{},1", rg, rg);
            }

            GreaterOrEqual => {
                emit!(self, "slt", "{},{},{}", rg, lhs, rhs);
                emit!(self, "xori", "{},{},1", rg, rg);
            }

            Equal => {
                emit!(self, "xor", "{},{},{}", rg, lhs, rhs);
                emit!(self, "sltiu", "{},{},1", rg, rg);
            }

            NotEqual => {
                emit!(self, "xor", "{},{},{}", rg, lhs, rhs);
                emit!(self, "sltu", "{},{},{}", rg, Reg::ZERO, rg);
            }

            LogicalOr | BitOr => emit!(self, "or", "{},{},{}", rg, lhs, rhs),
            LogicalAnd | BitAnd => emit!(self, "and", "{},{},{}", rg, lhs, rhs),
            BitXor => emit!(self, "xor", "{},{},{}", rg, lhs, rhs),

            ShiftLeft => emit!(self, "sll", "{},{},{}", rg, lhs, rhs),
            ShiftRight => emit!(self, "srl", "{},{},{}", rg, lhs, rhs),
        }
    }

    fn unary(&mut self, op: UnaryOp, rg: Reg, operand: &Located<Expr>) -> Gen<()> {
        use UnaryOp::*;

        match op {
            Sizeof => emit!(self, "li", "{},{}", rg, riscv::INT_SIZE),

            PreIncrement | PreDecrement => {
                let offset = self.lvalue(operand)?;
                let step = if op == PreIncrement { 1 } else { -1 };

                emit!(self, "lw", "{},{}({})", rg, offset, Reg::S0);
                emit!(self, "addi", "{},{},{}", rg, rg, step);
                emit!(self, "sw", "{},{}({})", rg, offset, Reg::S0);
            }

            Plus | Minus | BitNot | Not => {
                let value = self.expr(operand)?;
                match op {
                    Plus => emit!(self, "mv", "{},{}", rg, value),
                    Minus => emit!(self, "sub", "{},{},{}", rg, Reg::ZERO, value),
                    BitNot => emit!(self, "xori", "{},{},-1", rg, value),
                    _ => emit!(self, "sltiu", "{},{},1", rg, value),
                }

                self.regs.release(value);
            }

            AddressOf => return unsupported("the address-of operator", operand.location()),
            Deref => return unsupported("pointer dereference", operand.location()),
        }

        Ok(())
    }

    /// Ranura de una expresión asignable.
    fn lvalue(&self, expr: &Located<Expr>) -> Gen<i32> {
        match expr.val() {
            Expr::Variable(id) => self.lookup(id, expr.location()),
            _ => Err(Located::at(CodegenError::NotAssignable, expr.location().clone())),
        }
    }

    /// Resuelve un nombre desde el scope más interno hacia afuera.
    fn lookup(&self, id: &Identifier, location: &Location) -> Gen<i32> {
        std::iter::once(&self.scope)
            .chain(self.outer.iter().rev())
            .find_map(|scope| scope.get(id.as_str()))
            .map(|symbol| symbol.offset)
            .ok_or_else(|| Located::at(CodegenError::Undefined(id.clone()), location.clone()))
    }

    fn next_label(&mut self) -> u32 {
        self.labels += 1;
        self.labels
    }

    fn label(&mut self, label: &str) {
        self.line(format_args!("{}:", label));
    }

    fn line(&mut self, line: fmt::Arguments<'_>) {
        self.output.push_str(&line.to_string());
        self.output.push('\n');
    }
}

fn unsupported<T>(construct: &'static str, location: &Location) -> Gen<T> {
    Err(Located::at(CodegenError::Unsupported(construct), location.clone()))
}
