//! Árbol de sintaxis abstracta.
//!
//! Las clases de nodo son un tipo distinto de las clases de token. La
//! correspondencia entre ambas es explícita y se concentra en
//! [`BinOp::from_token()`], [`BinOp::from_compound()`] y en las
//! precedencias de [`BinOp::precedence()`].
//!
//! Toda representación textual de un nodo usa la notación funcional de
//! los volcados de depuración, por ejemplo `ADD(INTCONST(1), IDENT(x))`.

use crate::{lex::TokenKind, source::Located};
use std::{
    fmt::{self, Display},
    rc::Rc,
};

/// Menor precedencia de un operador binario; la de `||`.
pub const BINARY: u8 = 4;

/// Un identificador de variable o función.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Una unidad de compilación: secuencia ordenada de declaraciones externas.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program(pub Vec<ExternalDecl>);

impl Program {
    pub fn declarations(&self) -> &[ExternalDecl] {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExternalDecl {
    Function(Function),

    /// Una declaración con varios declaradores produce varios nodos hermanos.
    Declaration(Declaration),
}

/// Definición de función sin parámetros.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Located<Identifier>,
    pub ty: Type,
    pub body: Vec<BlockItem>,
}

/// Declaración de una variable, con inicializador opcional.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: Located<Identifier>,
    pub ty: Type,
    pub init: Option<Located<Expr>>,
}

/// Tipo declarado. Solo existe un tipo entero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockItem {
    Declaration(Declaration),
    Statement(Statement),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Expr(Located<Expr>),
    Return(Option<Located<Expr>>),
    If {
        condition: Located<Expr>,
        then: Box<Statement>,
        otherwise: Option<Box<Statement>>,
    },
    Compound(Vec<BlockItem>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Integer(i64),
    Variable(Identifier),
    Binary(BinOp, Box<Located<Expr>>, Box<Located<Expr>>),
    Unary(UnaryOp, Box<Located<Expr>>),
    Postfix(PostfixOp, Box<Located<Expr>>),

    /// Asignación simple. Las asignaciones compuestas se reescriben como
    /// `lhs = lhs OP rhs` durante el parsing.
    Assign(Box<Located<Expr>>, Box<Located<Expr>>),

    Conditional {
        condition: Box<Located<Expr>>,
        then: Box<Located<Expr>>,
        otherwise: Box<Located<Expr>>,
    },

    Comma(Box<Located<Expr>>, Box<Located<Expr>>),
    Call(Box<Located<Expr>>, Vec<Located<Expr>>),
    Index(Box<Located<Expr>>, Box<Located<Expr>>),
    Member {
        base: Box<Located<Expr>>,
        field: Located<Identifier>,
        arrow: bool,
    },
}

/// Los 18 operadores binarios.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// Operador binario que corresponde a un token infijo.
    pub fn from_token(kind: TokenKind) -> Option<BinOp> {
        use BinOp::*;

        let op = match kind {
            TokenKind::OrOr   => LogicalOr,
            TokenKind::AndAnd => LogicalAnd,
            TokenKind::Or     => BitOr,
            TokenKind::Xor    => BitXor,
            TokenKind::And    => BitAnd,
            TokenKind::Eq     => Equal,
            TokenKind::Neq    => NotEqual,
            TokenKind::Lt     => Less,
            TokenKind::Gt     => Greater,
            TokenKind::Leq    => LessOrEqual,
            TokenKind::Geq    => GreaterOrEqual,
            TokenKind::LShift => ShiftLeft,
            TokenKind::RShift => ShiftRight,
            TokenKind::Add    => Add,
            TokenKind::Sub    => Sub,
            TokenKind::Mul    => Mul,
            TokenKind::Div    => Div,
            TokenKind::Mod    => Mod,
            _ => return None,
        };

        Some(op)
    }

    /// Operador implícito en una asignación compuesta, como `+` en `+=`.
    pub fn from_compound(kind: TokenKind) -> Option<BinOp> {
        use BinOp::*;

        let op = match kind {
            TokenKind::AddAssign    => Add,
            TokenKind::SubAssign    => Sub,
            TokenKind::MulAssign    => Mul,
            TokenKind::DivAssign    => Div,
            TokenKind::ModAssign    => Mod,
            TokenKind::LShiftAssign => ShiftLeft,
            TokenKind::RShiftAssign => ShiftRight,
            TokenKind::AndAssign    => BitAnd,
            TokenKind::OrAssign     => BitOr,
            TokenKind::XorAssign    => BitXor,
            _ => return None,
        };

        Some(op)
    }

    /// Nivel de precedencia, entre [`BINARY`] y 13. Todos son asociativos
    /// a la izquierda.
    pub fn precedence(self) -> u8 {
        use BinOp::*;

        match self {
            LogicalOr => 4,
            LogicalAnd => 5,
            BitOr => 6,
            BitXor => 7,
            BitAnd => 8,
            Equal | NotEqual => 9,
            Less | Greater | LessOrEqual | GreaterOrEqual => 10,
            ShiftLeft | ShiftRight => 11,
            Add | Sub => 12,
            Mul | Div | Mod => 13,
        }
    }

    /// Token del cual proviene el operador.
    pub fn token(self) -> TokenKind {
        use BinOp::*;

        match self {
            LogicalOr      => TokenKind::OrOr,
            LogicalAnd     => TokenKind::AndAnd,
            BitOr          => TokenKind::Or,
            BitXor         => TokenKind::Xor,
            BitAnd         => TokenKind::And,
            Equal          => TokenKind::Eq,
            NotEqual       => TokenKind::Neq,
            Less           => TokenKind::Lt,
            Greater        => TokenKind::Gt,
            LessOrEqual    => TokenKind::Leq,
            GreaterOrEqual => TokenKind::Geq,
            ShiftLeft      => TokenKind::LShift,
            ShiftRight     => TokenKind::RShift,
            Add            => TokenKind::Add,
            Sub            => TokenKind::Sub,
            Mul            => TokenKind::Mul,
            Div            => TokenKind::Div,
            Mod            => TokenKind::Mod,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    PreIncrement,
    PreDecrement,
    AddressOf,
    Deref,
    Plus,
    Minus,
    BitNot,
    Not,
    Sizeof,
}

impl UnaryOp {
    /// Operador unario que corresponde a un token prefijo.
    pub fn from_token(kind: TokenKind) -> Option<UnaryOp> {
        use UnaryOp::*;

        let op = match kind {
            TokenKind::Incr  => PreIncrement,
            TokenKind::Decr  => PreDecrement,
            TokenKind::And   => AddressOf,
            TokenKind::Mul   => Deref,
            TokenKind::Add   => Plus,
            TokenKind::Sub   => Minus,
            TokenKind::Tilde => BitNot,
            TokenKind::Not   => Not,
            TokenKind::Keyword(crate::lex::Keyword::Sizeof) => Sizeof,
            _ => return None,
        };

        Some(op)
    }

    fn name(self) -> &'static str {
        use UnaryOp::*;

        match self {
            PreIncrement => "INCR",
            PreDecrement => "DECR",
            AddressOf => "AND",
            Deref => "MUL",
            Plus => "ADD",
            Minus => "SUB",
            BitNot => "TILDA",
            Not => "NOT",
            Sizeof => "SIZEOF",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl Display for Expr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(value) => write!(fmt, "INTCONST({})", value),
            Expr::Variable(id) => write!(fmt, "IDENT({})", id),

            Expr::Binary(op, lhs, rhs) => {
                write!(fmt, "{}({}, {})", op.token().name(), lhs.val(), rhs.val())
            }

            Expr::Unary(op, operand) => write!(fmt, "{}({})", op.name(), operand.val()),

            Expr::Postfix(op, operand) => {
                let name = match op {
                    PostfixOp::Increment => "POSTINCR",
                    PostfixOp::Decrement => "POSTDECR",
                };

                write!(fmt, "{}({})", name, operand.val())
            }

            Expr::Assign(lhs, rhs) => write!(fmt, "ASSIGN({}, {})", lhs.val(), rhs.val()),

            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => write!(
                fmt,
                "QMARK({}, COLON({}, {}))",
                condition.val(),
                then.val(),
                otherwise.val()
            ),

            Expr::Comma(lhs, rhs) => write!(fmt, "COMMA({}, {})", lhs.val(), rhs.val()),

            Expr::Call(callee, args) => {
                write!(fmt, "CALL({}", callee.val())?;
                for arg in args {
                    write!(fmt, ", {}", arg.val())?;
                }

                fmt.write_str(")")
            }

            Expr::Index(base, index) => write!(fmt, "OBR({}, {})", base.val(), index.val()),

            Expr::Member { base, field, arrow } => {
                let name = if *arrow { "DEREF" } else { "DOT" };
                write!(fmt, "{}({}, IDENT({}))", name, base.val(), field.val())
            }
        }
    }
}
