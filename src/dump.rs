//! Volcados de depuración.
//!
//! Vistas de solo lectura sobre los tokens y el AST, pensadas para
//! inspección manual. Ninguna forma parte del contrato de salida.

use crate::{
    ast::{BlockItem, Declaration, Expr, ExternalDecl, Program, Statement},
    lex::Token,
    source::Located,
};

use std::fmt::{self, Display, Formatter};

/// Un token por línea, con su ubicación y lexema.
pub struct Tokens<'a>(pub &'a [Located<Token>]);

impl Display for Tokens<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        for token in self.0 {
            let location = token.location().to_string();
            let description = token.val().to_string();

            writeln!(
                fmt,
                "{:<24} {:<20} {:?}",
                location,
                description,
                token.location().lexeme()
            )?;
        }

        Ok(())
    }
}

/// Árbol indentado, un nodo por línea.
pub struct Ast<'a>(pub &'a Program);

impl Display for Ast<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        for declaration in self.0.declarations() {
            match declaration {
                ExternalDecl::Function(function) => {
                    writeln!(fmt, "FUNCTION {} {}", function.ty, function.name.val())?;
                    for item in &function.body {
                        block_item(fmt, item, 1)?;
                    }
                }

                ExternalDecl::Declaration(decl) => declaration_node(fmt, decl, 0)?,
            }
        }

        Ok(())
    }
}

fn block_item(fmt: &mut Formatter<'_>, item: &BlockItem, depth: usize) -> fmt::Result {
    match item {
        BlockItem::Declaration(decl) => declaration_node(fmt, decl, depth),
        BlockItem::Statement(statement) => statement_node(fmt, statement, depth),
    }
}

fn declaration_node(fmt: &mut Formatter<'_>, decl: &Declaration, depth: usize) -> fmt::Result {
    indent(fmt, depth)?;
    writeln!(fmt, "DECLARATION {} {}", decl.ty, decl.name.val())?;

    match &decl.init {
        Some(init) => expr_node(fmt, init, depth + 1),
        None => Ok(()),
    }
}

fn statement_node(fmt: &mut Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    indent(fmt, depth)?;

    match statement {
        Statement::Expr(expr) => {
            writeln!(fmt, "EXPR")?;
            expr_node(fmt, expr, depth + 1)
        }

        Statement::Return(value) => {
            writeln!(fmt, "RETURN")?;
            match value {
                Some(value) => expr_node(fmt, value, depth + 1),
                None => Ok(()),
            }
        }

        Statement::If {
            condition,
            then,
            otherwise,
        } => {
            writeln!(fmt, "IF")?;
            expr_node(fmt, condition, depth + 1)?;
            statement_node(fmt, then, depth + 1)?;

            if let Some(otherwise) = otherwise {
                indent(fmt, depth)?;
                writeln!(fmt, "ELSE")?;
                statement_node(fmt, otherwise, depth + 1)?;
            }

            Ok(())
        }

        Statement::Compound(items) => {
            writeln!(fmt, "BLOCK")?;
            items
                .iter()
                .try_for_each(|item| block_item(fmt, item, depth + 1))
        }
    }
}

fn expr_node(fmt: &mut Formatter<'_>, expr: &Located<Expr>, depth: usize) -> fmt::Result {
    indent(fmt, depth)?;

    // Las hojas y nodos unarios caben en una línea
    let children: Vec<&Located<Expr>> = match expr.val() {
        Expr::Binary(op, lhs, rhs) => {
            writeln!(fmt, "{}", op.token().name())?;
            vec![&**lhs, &**rhs]
        }

        Expr::Assign(lhs, rhs) => {
            writeln!(fmt, "ASSIGN")?;
            vec![&**lhs, &**rhs]
        }

        Expr::Comma(lhs, rhs) => {
            writeln!(fmt, "COMMA")?;
            vec![&**lhs, &**rhs]
        }

        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            writeln!(fmt, "QMARK")?;
            vec![&**condition, &**then, &**otherwise]
        }

        Expr::Call(callee, args) => {
            writeln!(fmt, "CALL")?;
            std::iter::once(&**callee).chain(args).collect()
        }

        Expr::Index(base, index) => {
            writeln!(fmt, "OBR")?;
            vec![&**base, &**index]
        }

        other => {
            writeln!(fmt, "{}", other)?;
            Vec::new()
        }
    };

    children
        .into_iter()
        .try_for_each(|child| expr_node(fmt, child, depth + 1))
}

fn indent(fmt: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    write!(fmt, "{:width$}", "", width = 2 * depth)
}
