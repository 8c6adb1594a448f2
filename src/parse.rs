//! Análisis sintáctico.
//!
//! Descenso recursivo sin backtracking sobre el flujo de tokens: un token
//! de lookahead basta para decidir cada producción. Las expresiones
//! binarias se resuelven por precedence climbing con la tabla de
//! [`crate::ast`].
//!
//! El token [`TokenKind::Eoi`] final nunca se consume, solo se observa.

use log::debug;
use thiserror::Error;

use crate::{
    ast::{
        self, BinOp, BlockItem, Declaration, Expr, ExternalDecl, Function, Identifier, PostfixOp,
        Program, Statement, Type, UnaryOp,
    },
    lex::{Keyword, Literal, Token, TokenKind},
    source::{Located, Location},
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Expected {expected}, found {found} instead")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
    },

    #[error("Expected an expression, found {0} instead")]
    ExpectedExpr(TokenKind),

    #[error("Expected identifier, found {0} instead")]
    ExpectedId(TokenKind),

    #[error("Expected type specifier `int`, found {0} instead")]
    ExpectedType(TokenKind),

    #[error("Unsupported construct: {0}")]
    Unsupported(&'static str),

    #[error("Statement {0} is not supported")]
    UnsupportedStatement(TokenKind),
}

/// Construye el AST de una unidad de compilación.
///
/// # Panics
/// Si `tokens` no termina en [`TokenKind::Eoi`], como lo garantiza
/// [`crate::lex::scan()`].
pub fn parse(tokens: &[Located<Token>]) -> Result<Program, Located<ParserError>> {
    let program = Parser::new(tokens).program()?;
    debug!("parsed {} external declarations", program.declarations().len());

    Ok(program)
}

/// Analiza una única expresión completa, incluyendo el operador coma.
///
/// Tras la expresión solo puede seguir el fin de entrada.
///
/// # Panics
/// Bajo las mismas condiciones que [`parse()`].
pub fn expression(tokens: &[Located<Token>]) -> Result<Located<Expr>, Located<ParserError>> {
    let mut parser = Parser::new(tokens);
    let expr = parser.expr()?;
    parser.expect(TokenKind::Eoi)?;

    Ok(expr)
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Resultado transitorio de un declarador, consumido de inmediato por
/// el constructor de funciones o de declaraciones.
struct Declarator {
    name: Located<Identifier>,
    function: bool,
    pointers: usize,
    dimensions: usize,
}

struct Parser<'a> {
    tokens: &'a [Located<Token>],
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Located<Token>]) -> Self {
        let terminated = matches!(tokens.last(), Some(last) if last.val().kind() == TokenKind::Eoi);
        assert!(terminated, "token stream is not terminated by EOI");

        Parser {
            tokens,
            position: 0,
        }
    }

    fn program(&mut self) -> Parse<Program> {
        let mut declarations = Vec::new();
        while !self.at(TokenKind::Eoi) {
            self.external(&mut declarations)?;
        }

        Ok(Program(declarations))
    }

    fn external(&mut self, into: &mut Vec<ExternalDecl>) -> Parse<()> {
        let ty = self.specifier()?;
        let declarator = self.declarator()?;

        if declarator.function {
            let function = self.function(declarator, ty)?;
            into.push(ExternalDecl::Function(function));
        } else {
            let declarations = self.declaration_list(declarator, ty)?;
            into.extend(declarations.into_iter().map(ExternalDecl::Declaration));
        }

        Ok(())
    }

    fn specifier(&mut self) -> Parse<Type> {
        match self.kind() {
            TokenKind::Keyword(Keyword::Int) => {
                self.next();
                Ok(Type::Int)
            }

            found => self.fail(ParserError::ExpectedType(found)),
        }
    }

    fn declarator(&mut self) -> Parse<Declarator> {
        let mut pointers = 0;
        while self.eat(TokenKind::Mul) {
            pointers += 1;
        }

        let name = self.id()?;
        if self.eat(TokenKind::OpenParen) {
            if !self.at(TokenKind::CloseParen) {
                return self.fail(ParserError::Unsupported("function parameters"));
            }

            self.next();
            return Ok(Declarator {
                name,
                function: true,
                pointers,
                dimensions: 0,
            });
        }

        let mut dimensions = 0;
        while self.eat(TokenKind::OpenSquare) {
            if self.at(TokenKind::IntConst) {
                self.next();
            }

            self.expect(TokenKind::CloseSquare)?;
            dimensions += 1;
        }

        Ok(Declarator {
            name,
            function: false,
            pointers,
            dimensions,
        })
    }

    fn function(&mut self, declarator: Declarator, ty: Type) -> Parse<Function> {
        if declarator.pointers > 0 {
            return self.fail_at(
                ParserError::Unsupported("pointer return types"),
                declarator.name.location(),
            );
        }

        let body = self.compound()?;
        Ok(Function {
            name: declarator.name,
            ty,
            body,
        })
    }

    /// Resto de una declaración tras su primer declarador, hasta `;`.
    fn declaration_list(&mut self, first: Declarator, ty: Type) -> Parse<Vec<Declaration>> {
        let mut declarations = Vec::new();
        let mut declarator = first;

        loop {
            if declarator.function {
                return self.fail_at(
                    ParserError::Unsupported("function declarators in a declaration list"),
                    declarator.name.location(),
                );
            } else if declarator.pointers > 0 {
                return self.fail_at(
                    ParserError::Unsupported("pointer declarators"),
                    declarator.name.location(),
                );
            } else if declarator.dimensions > 0 {
                return self.fail_at(
                    ParserError::Unsupported("array declarators"),
                    declarator.name.location(),
                );
            }

            let init = match self.eat(TokenKind::Assign) {
                true => Some(self.assignment()?),
                false => None,
            };

            declarations.push(Declaration {
                name: declarator.name,
                ty,
                init,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }

            declarator = self.declarator()?;
        }

        self.expect(TokenKind::Semicolon)?;
        Ok(declarations)
    }

    fn compound(&mut self) -> Parse<Vec<BlockItem>> {
        self.expect(TokenKind::OpenCurly)?;

        let mut items = Vec::new();
        while !self.eat(TokenKind::CloseCurly) {
            self.block_item(&mut items)?;
        }

        Ok(items)
    }

    fn block_item(&mut self, into: &mut Vec<BlockItem>) -> Parse<()> {
        if self.at(TokenKind::Keyword(Keyword::Int)) {
            let ty = self.specifier()?;
            let declarator = self.declarator()?;

            if declarator.function {
                return self.fail_at(
                    ParserError::Unsupported("nested function declarations"),
                    declarator.name.location(),
                );
            }

            let declarations = self.declaration_list(declarator, ty)?;
            into.extend(declarations.into_iter().map(BlockItem::Declaration));
        } else {
            into.push(BlockItem::Statement(self.statement()?));
        }

        Ok(())
    }

    fn statement(&mut self) -> Parse<Statement> {
        use Keyword::*;

        match self.kind() {
            TokenKind::Keyword(Return) => {
                self.next();

                let value = match self.at(TokenKind::Semicolon) {
                    true => None,
                    false => Some(self.expr()?),
                };

                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Return(value))
            }

            TokenKind::Keyword(If) => self.if_statement(),
            TokenKind::OpenCurly => Ok(Statement::Compound(self.compound()?)),

            kind @ TokenKind::Keyword(While)
            | kind @ TokenKind::Keyword(For)
            | kind @ TokenKind::Keyword(Do)
            | kind @ TokenKind::Keyword(Switch)
            | kind @ TokenKind::Keyword(Goto)
            | kind @ TokenKind::Keyword(Case)
            | kind @ TokenKind::Keyword(Default)
            | kind @ TokenKind::Keyword(Continue)
            | kind @ TokenKind::Keyword(Break) => self.fail(ParserError::UnsupportedStatement(kind)),

            _ => {
                let expr = self.expr()?;
                self.expect(TokenKind::Semicolon)?;

                Ok(Statement::Expr(expr))
            }
        }
    }

    fn if_statement(&mut self) -> Parse<Statement> {
        self.expect(TokenKind::Keyword(Keyword::If))?;

        self.expect(TokenKind::OpenParen)?;
        let condition = self.expr()?;
        self.expect(TokenKind::CloseParen)?;

        let then = Box::new(self.statement()?);
        let otherwise = match self.eat(TokenKind::Keyword(Keyword::Else)) {
            true => Some(Box::new(self.statement()?)),
            false => None,
        };

        Ok(Statement::If {
            condition,
            then,
            otherwise,
        })
    }

    /// Expresión completa, con el operador coma como nivel más bajo.
    fn expr(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.assignment()?;
        while self.eat(TokenKind::Comma) {
            let rhs = self.assignment()?;
            lhs = fold(lhs, rhs, Expr::Comma);
        }

        Ok(lhs)
    }

    fn assignment(&mut self) -> Parse<Located<Expr>> {
        let lhs = self.conditional()?;

        let kind = self.kind();
        let compound = BinOp::from_compound(kind);
        if kind != TokenKind::Assign && compound.is_none() {
            return Ok(lhs);
        }

        self.next();
        let rhs = self.assignment()?;

        let rhs = match compound {
            Some(op) => fold(lhs.clone(), rhs, |lhs, rhs| Expr::Binary(op, lhs, rhs)),
            None => rhs,
        };

        Ok(fold(lhs, rhs, Expr::Assign))
    }

    fn conditional(&mut self) -> Parse<Located<Expr>> {
        let condition = self.binary(ast::BINARY)?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }

        let then = self.expr()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.conditional()?;

        let location = Location::span(condition.location().clone(), otherwise.location());
        let expr = Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        };

        Ok(Located::at(expr, location))
    }

    /// Precedence climbing sobre los niveles binarios `minimum..=13`.
    ///
    /// Desde la precedencia del operador actual y hasta `minimum`, se
    /// pliegan todos los operadores de exactamente ese nivel, con el
    /// operando derecho analizado un nivel por encima.
    fn binary(&mut self, minimum: u8) -> Parse<Located<Expr>> {
        let mut lhs = self.unary()?;

        let mut level = self.binary_op().map_or(0, BinOp::precedence);
        while level >= minimum {
            while let Some(op) = self.binary_op().filter(|op| op.precedence() == level) {
                self.next();

                let rhs = self.binary(level + 1)?;
                lhs = fold(lhs, rhs, |lhs, rhs| Expr::Binary(op, lhs, rhs));
            }

            level -= 1;
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Parse<Located<Expr>> {
        let op = match UnaryOp::from_token(self.kind()) {
            Some(op) => op,
            None => return self.postfix(),
        };

        let start = self.next().location().clone();
        if op == UnaryOp::Sizeof && self.at(TokenKind::OpenParen) {
            return self.fail(ParserError::Unsupported("sizeof with a parenthesized operand"));
        }

        let operand = self.unary()?;
        let location = Location::span(start, operand.location());

        Ok(Located::at(Expr::Unary(op, Box::new(operand)), location))
    }

    /// Como máximo un operador postfijo tras una expresión primaria.
    fn postfix(&mut self) -> Parse<Located<Expr>> {
        let primary = self.primary()?;
        let start = primary.location().clone();
        let base = Box::new(primary);

        let expr = match self.kind() {
            TokenKind::OpenSquare => {
                self.next();
                let index = self.expr()?;
                self.expect(TokenKind::CloseSquare)?;

                Expr::Index(base, Box::new(index))
            }

            TokenKind::OpenParen => {
                self.next();

                let mut args = Vec::new();
                if !self.at(TokenKind::CloseParen) {
                    args.push(self.assignment()?);
                    while self.eat(TokenKind::Comma) {
                        args.push(self.assignment()?);
                    }
                }

                self.expect(TokenKind::CloseParen)?;
                Expr::Call(base, args)
            }

            kind @ TokenKind::Dot | kind @ TokenKind::Arrow => {
                self.next();
                let field = self.id()?;

                Expr::Member {
                    base,
                    field,
                    arrow: kind == TokenKind::Arrow,
                }
            }

            TokenKind::Incr => {
                self.next();
                Expr::Postfix(PostfixOp::Increment, base)
            }

            TokenKind::Decr => {
                self.next();
                Expr::Postfix(PostfixOp::Decrement, base)
            }

            _ => return Ok(*base),
        };

        let location = Location::span(start, self.previous());
        Ok(Located::at(expr, location))
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        let token = self.peek();
        let expr = match token.val().kind() {
            TokenKind::Ident => Expr::Variable(Identifier::new(token.location().lexeme())),

            TokenKind::IntConst => match token.val().value() {
                Some(Literal::Int(value)) => Expr::Integer(value),
                _ => return self.fail(ParserError::ExpectedExpr(TokenKind::IntConst)),
            },

            TokenKind::OpenParen => {
                return self.fail(ParserError::Unsupported("parenthesized expressions"))
            }

            TokenKind::StrConst => return self.fail(ParserError::Unsupported("string literals")),
            TokenKind::CharConst => {
                return self.fail(ParserError::Unsupported("character constants"))
            }

            TokenKind::FloatConst | TokenKind::DoubleConst | TokenKind::LongDoubleConst => {
                return self.fail(ParserError::Unsupported("floating constants"))
            }

            found => return self.fail(ParserError::ExpectedExpr(found)),
        };

        self.next();
        Ok(Located::at(expr, token.location().clone()))
    }

    fn binary_op(&self) -> Option<BinOp> {
        BinOp::from_token(self.kind())
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        match self.kind() {
            TokenKind::Ident => {
                let location = self.next().location().clone();
                let id = Identifier::new(location.lexeme());

                Ok(Located::at(id, location))
            }

            found => self.fail(ParserError::ExpectedId(found)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Parse<&'a Located<Token>> {
        match self.kind() {
            found if found == kind => Ok(self.next()),
            found => self.fail(ParserError::UnexpectedToken {
                expected: kind,
                found,
            }),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        let matches = self.at(kind);
        if matches {
            self.next();
        }

        matches
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn kind(&self) -> TokenKind {
        self.peek().val().kind()
    }

    fn peek(&self) -> &'a Located<Token> {
        &self.tokens[self.position]
    }

    /// Avanza un token, excepto sobre el fin de entrada.
    fn next(&mut self) -> &'a Located<Token> {
        let token = self.peek();
        if token.val().kind() != TokenKind::Eoi {
            self.position += 1;
        }

        token
    }

    fn previous(&self) -> &'a Location {
        self.tokens[self.position.saturating_sub(1)].location()
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        self.fail_at(error, self.peek().location())
    }

    fn fail_at<T>(&self, error: ParserError, location: &Location) -> Parse<T> {
        Err(Located::at(error, location.clone()))
    }
}

/// Pliega dos operandos en un nodo que abarca a ambos.
fn fold<F>(lhs: Located<Expr>, rhs: Located<Expr>, node: F) -> Located<Expr>
where
    F: FnOnce(Box<Located<Expr>>, Box<Located<Expr>>) -> Expr,
{
    let location = Location::span(lhs.location().clone(), rhs.location());
    Located::at(node(Box::new(lhs), Box::new(rhs)), location)
}
