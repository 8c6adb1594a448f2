use ganymede::{
    ast::{BinOp, BlockItem, Expr, ExternalDecl, Program, Statement, UnaryOp},
    lex::{scan, Keyword, TokenKind},
    parse::{expression, parse, ParserError},
    source::{Located, Source},
};

fn expr(text: &str) -> Located<Expr> {
    let tokens = scan(&Source::new("<test>", text)).expect("lexing failed");
    expression(&tokens).expect("parsing failed")
}

fn program(text: &str) -> Program {
    let tokens = scan(&Source::new("<test>", text)).expect("lexing failed");
    parse(&tokens).expect("parsing failed")
}

fn error(text: &str) -> ParserError {
    let tokens = scan(&Source::new("<test>", text)).expect("lexing failed");
    parse(&tokens).expect_err("parsing should fail").into_inner()
}

fn tree(text: &str) -> String {
    expr(text).val().to_string()
}

#[test]
fn multiplication_binds_tighter() {
    assert_eq!(tree("1+2*3"), "ADD(INTCONST(1), MUL(INTCONST(2), INTCONST(3)))");
    assert_eq!(tree("1*2+3"), "ADD(MUL(INTCONST(1), INTCONST(2)), INTCONST(3))");
}

#[test]
fn left_associativity() {
    assert_eq!(tree("1-2-3"), "SUB(SUB(INTCONST(1), INTCONST(2)), INTCONST(3))");
    assert_eq!(tree("8/4%3"), "MOD(DIV(INTCONST(8), INTCONST(4)), INTCONST(3))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(tree("a = b = 1"), "ASSIGN(IDENT(a), ASSIGN(IDENT(b), INTCONST(1)))");
}

#[test]
fn compound_assignment_desugars() {
    assert_eq!(expr("x += 1"), expr("x = x + 1"));
    assert_eq!(expr("x <<= y"), expr("x = x << y"));
    assert_eq!(expr("x ^= 2 * y"), expr("x = x ^ 2 * y"));
}

#[test]
fn full_precedence_ladder() {
    assert_eq!(
        tree("a || b && c | d ^ e & f == g < h << i + j * k"),
        "OROR(IDENT(a), ANDAND(IDENT(b), OR(IDENT(c), XOR(IDENT(d), AND(IDENT(e), \
         EQ(IDENT(f), LT(IDENT(g), LSHIFT(IDENT(h), ADD(IDENT(i), MUL(IDENT(j), IDENT(k)))))))))))"
    );

    assert_eq!(
        tree("a * b - c < d"),
        "LT(SUB(MUL(IDENT(a), IDENT(b)), IDENT(c)), IDENT(d))"
    );
}

#[test]
fn conditional_nests_to_the_right() {
    assert_eq!(
        tree("a ? b : c ? d : e"),
        "QMARK(IDENT(a), COLON(IDENT(b), QMARK(IDENT(c), COLON(IDENT(d), IDENT(e)))))"
    );

    assert_eq!(
        tree("a ? b, c : d"),
        "QMARK(IDENT(a), COLON(COMMA(IDENT(b), IDENT(c)), IDENT(d)))"
    );
}

#[test]
fn comma_is_lowest() {
    assert_eq!(
        tree("a = 1, b = 2"),
        "COMMA(ASSIGN(IDENT(a), INTCONST(1)), ASSIGN(IDENT(b), INTCONST(2)))"
    );
}

#[test]
fn unary_and_postfix() {
    assert_eq!(tree("-x"), "SUB(IDENT(x))");
    assert_eq!(tree("!~x"), "NOT(TILDA(IDENT(x)))");
    assert_eq!(tree("++x"), "INCR(IDENT(x))");
    assert_eq!(tree("x--"), "POSTDECR(IDENT(x))");
    assert_eq!(tree("sizeof x"), "SIZEOF(IDENT(x))");
    assert_eq!(tree("f(1, a = 2)"), "CALL(IDENT(f), INTCONST(1), ASSIGN(IDENT(a), INTCONST(2)))");
    assert_eq!(tree("v[i]"), "OBR(IDENT(v), IDENT(i))");
    assert_eq!(tree("s.x"), "DOT(IDENT(s), IDENT(x))");
    assert_eq!(tree("p->x"), "DEREF(IDENT(p), IDENT(x))");

    match expr("-1 * 2").into_inner() {
        Expr::Binary(BinOp::Mul, lhs, _) => {
            assert!(matches!(lhs.val(), Expr::Unary(UnaryOp::Minus, _)))
        }

        other => panic!("unexpected tree {}", other),
    }
}

#[test]
fn at_most_one_postfix() {
    let tokens = scan(&Source::new("<test>", "x++ ++")).unwrap();
    let error = expression(&tokens).unwrap_err();

    assert_eq!(
        error.into_inner(),
        ParserError::UnexpectedToken {
            expected: TokenKind::Eoi,
            found: TokenKind::Incr,
        }
    );
}

#[test]
fn function_with_declarations_and_statements() {
    let program = program("int f() { int x = 5, y; y = x; if (x) return y; else { return 0; } }");

    let function = match program.declarations() {
        [ExternalDecl::Function(function)] => function,
        other => panic!("unexpected declarations {:?}", other),
    };

    assert_eq!(function.name.val().as_str(), "f");
    assert_eq!(function.body.len(), 4);

    match &function.body[0] {
        BlockItem::Declaration(decl) => {
            assert_eq!(decl.name.val().as_str(), "x");
            assert_eq!(decl.init.as_ref().map(|init| init.val().to_string()), Some("INTCONST(5)".into()));
        }

        other => panic!("unexpected item {:?}", other),
    }

    match &function.body[1] {
        BlockItem::Declaration(decl) => {
            assert_eq!(decl.name.val().as_str(), "y");
            assert!(decl.init.is_none());
        }

        other => panic!("unexpected item {:?}", other),
    }

    match &function.body[3] {
        BlockItem::Statement(Statement::If { otherwise, .. }) => {
            assert!(matches!(otherwise.as_deref(), Some(Statement::Compound(items)) if items.len() == 1))
        }

        other => panic!("unexpected item {:?}", other),
    }
}

#[test]
fn else_binds_to_nearest_if() {
    let program = program("int f() { int a, b, x, y; if (a) if (b) x; else y; }");

    let function = match program.declarations() {
        [ExternalDecl::Function(function)] => function,
        other => panic!("unexpected declarations {:?}", other),
    };

    match function.body.last() {
        Some(BlockItem::Statement(Statement::If {
            then, otherwise, ..
        })) => {
            assert!(otherwise.is_none());
            match &**then {
                Statement::If {
                    otherwise: Some(inner),
                    ..
                } => assert!(matches!(&**inner, Statement::Expr(expr) if expr.val().to_string() == "IDENT(y)")),

                other => panic!("unexpected inner statement {:?}", other),
            }
        }

        other => panic!("unexpected item {:?}", other),
    }
}

#[test]
fn top_level_declaration_lists() {
    let program = program("int a, b = 2; int main() { return a; }");
    let kinds: Vec<_> = program
        .declarations()
        .iter()
        .map(|decl| match decl {
            ExternalDecl::Function(function) => format!("fn {}", function.name.val()),
            ExternalDecl::Declaration(decl) => format!("var {}", decl.name.val()),
        })
        .collect();

    assert_eq!(kinds, vec!["var a", "var b", "fn main"]);
}

#[test]
fn empty_return() {
    let program = program("int f() { return; }");
    match program.declarations() {
        [ExternalDecl::Function(function)] => {
            assert_eq!(function.body, vec![BlockItem::Statement(Statement::Return(None))])
        }

        other => panic!("unexpected declarations {:?}", other),
    }
}

#[test]
fn mismatch_reports_expected_and_found() {
    assert_eq!(
        error("int f() { return 1 }"),
        ParserError::UnexpectedToken {
            expected: TokenKind::Semicolon,
            found: TokenKind::CloseCurly,
        }
    );

    assert_eq!(
        error("int f() { if x) return 1; }"),
        ParserError::UnexpectedToken {
            expected: TokenKind::OpenParen,
            found: TokenKind::Ident,
        }
    );
}

#[test]
fn unsupported_constructs() {
    assert_eq!(error("char c;"), ParserError::ExpectedType(TokenKind::Keyword(Keyword::Char)));
    assert_eq!(error("int f() { return sizeof(int); }"), ParserError::Unsupported("sizeof with a parenthesized operand"));
    assert_eq!(error("int f() { return (1); }"), ParserError::Unsupported("parenthesized expressions"));
    assert_eq!(error("int f() { return \"s\"; }"), ParserError::Unsupported("string literals"));
    assert_eq!(error("int f() { return 1.5; }"), ParserError::Unsupported("floating constants"));
    assert_eq!(error("int f(x) { }"), ParserError::Unsupported("function parameters"));
    assert_eq!(error("int *p;"), ParserError::Unsupported("pointer declarators"));
    assert_eq!(error("int v[4];"), ParserError::Unsupported("array declarators"));
    assert_eq!(error("int f() { int g(); }"), ParserError::Unsupported("nested function declarations"));
    assert_eq!(
        error("int f() { while (1) x; }"),
        ParserError::UnsupportedStatement(TokenKind::Keyword(Keyword::While))
    );
}

#[test]
fn missing_expression() {
    assert_eq!(error("int f() { x = ; }"), ParserError::ExpectedExpr(TokenKind::Semicolon));
    assert_eq!(error("int f() { return 1 +"), ParserError::ExpectedExpr(TokenKind::Eoi));
}

#[test]
fn error_location_points_at_token() {
    let tokens = scan(&Source::new("<test>", "int f() {\n  return 1\n}")).unwrap();
    let error = parse(&tokens).unwrap_err();

    assert_eq!(error.location().start().line(), 3);
    assert_eq!(error.location().start().column(), 1);
}
