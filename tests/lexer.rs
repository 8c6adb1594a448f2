use ganymede::{
    lex::{scan, Keyword, LexerError, Literal, Token, TokenKind},
    source::{Located, Source},
};

fn tokens(text: &str) -> Vec<Located<Token>> {
    scan(&Source::new("<test>", text)).expect("lexing failed")
}

fn kinds(text: &str) -> Vec<TokenKind> {
    tokens(text).iter().map(|token| token.val().kind()).collect()
}

fn error(text: &str) -> LexerError {
    scan(&Source::new("<test>", text))
        .expect_err("lexing should fail")
        .into_inner()
}

#[test]
fn arithmetic_statement() {
    use TokenKind::*;

    let tokens = tokens("1+2*3;");
    let kinds: Vec<_> = tokens.iter().map(|token| token.val().kind()).collect();
    assert_eq!(kinds, vec![IntConst, Add, IntConst, Mul, IntConst, Semicolon, Eoi]);

    let values: Vec<_> = tokens.iter().filter_map(|token| token.val().value()).collect();
    assert_eq!(values, vec![Literal::Int(1), Literal::Int(2), Literal::Int(3)]);

    let dump: Vec<_> = tokens.iter().map(|token| token.val().to_string()).collect();
    assert_eq!(
        dump,
        vec!["INTCONST(1)", "ADD", "INTCONST(2)", "MUL", "INTCONST(3)", "SEMIC", "EOI"]
    );
}

#[test]
fn exactly_one_eoi() {
    assert_eq!(kinds(""), vec![TokenKind::Eoi]);
    assert_eq!(kinds("  \n\t // nothing\n /* here */ "), vec![TokenKind::Eoi]);

    let tokens = tokens("x");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].location().lexeme(), "");
}

#[test]
fn maximal_munch() {
    use TokenKind::*;

    assert_eq!(kinds("<<="), vec![LShiftAssign, Eoi]);
    assert_eq!(kinds("<<"), vec![LShift, Eoi]);
    assert_eq!(kinds("<="), vec![Leq, Eoi]);
    assert_eq!(kinds("< ="), vec![Lt, Assign, Eoi]);
    assert_eq!(kinds(">>= >> >= >"), vec![RShiftAssign, RShift, Geq, Gt, Eoi]);
    assert_eq!(kinds("-> -- -= -"), vec![Arrow, Decr, SubAssign, Sub, Eoi]);
    assert_eq!(kinds("a+++b"), vec![Ident, Incr, Add, Ident, Eoi]);
    assert_eq!(kinds("&& &= & || |= |"), vec![AndAnd, AndAssign, And, OrOr, OrAssign, Or, Eoi]);
    assert_eq!(kinds("... .."), vec![Ellipsis, Dot, Dot, Eoi]);
    assert_eq!(kinds("== = != !"), vec![Eq, Assign, Neq, Not, Eoi]);
    assert_eq!(kinds("## #"), vec![HashHash, Hash, Eoi]);
}

#[test]
fn digraphs() {
    use TokenKind::*;

    assert_eq!(
        kinds("<: :> <% %> %:"),
        vec![OpenSquare, CloseSquare, OpenCurly, CloseCurly, Hash, Eoi]
    );

    assert_eq!(kinds("%:%:"), vec![HashHash, Eoi]);
    assert_eq!(kinds("%:%: ##"), vec![HashHash, HashHash, Eoi]);
    assert_eq!(kinds("%:%"), vec![Hash, Mod, Eoi]);
    assert_eq!(tokens("%:%:")[0].val().to_string(), "TKPASTE");
}

#[test]
fn keywords_and_identifiers() {
    let keyword = TokenKind::Keyword;

    assert_eq!(
        kinds("int inline integer _if if0 return while sizeof"),
        vec![
            keyword(Keyword::Int),
            keyword(Keyword::Inline),
            TokenKind::Ident,
            TokenKind::Ident,
            TokenKind::Ident,
            keyword(Keyword::Return),
            keyword(Keyword::While),
            keyword(Keyword::Sizeof),
            TokenKind::Eoi
        ]
    );

    let tokens = tokens("counter_1");
    assert_eq!(tokens[0].location().lexeme(), "counter_1");
}

#[test]
fn numeric_literals() {
    let value = |text: &str| tokens(text)[0].val().value();

    assert_eq!(value("42"), Some(Literal::Int(42)));
    assert_eq!(value("0"), Some(Literal::Int(0)));
    assert_eq!(value("0x1F"), Some(Literal::Int(31)));
    assert_eq!(value("0XffL"), Some(Literal::Int(255)));
    assert_eq!(value("017"), Some(Literal::Int(15)));
    assert_eq!(value("10ul"), Some(Literal::Int(10)));
    assert_eq!(value("10LU"), Some(Literal::Int(10)));
    assert_eq!(value("1.5"), Some(Literal::Double(1.5)));
    assert_eq!(value(".5"), Some(Literal::Double(0.5)));
    assert_eq!(value("2e3"), Some(Literal::Double(2000.0)));
    assert_eq!(value("1.5e-1"), Some(Literal::Double(0.15)));
    assert_eq!(value("1.5f"), Some(Literal::Float(1.5)));
    assert_eq!(value("2.0L"), Some(Literal::LongDouble(2.0)));

    use TokenKind::*;
    assert_eq!(kinds("1.5f 2.0 3.0l 09.5"), vec![FloatConst, DoubleConst, LongDoubleConst, DoubleConst, Eoi]);
    assert_eq!(kinds("10ul;"), vec![IntConst, Semicolon, Eoi]);
}

#[test]
fn character_constants() {
    let value = |text: &str| tokens(text)[0].val().value();

    assert_eq!(value("'a'"), Some(Literal::Int(97)));
    assert_eq!(value("'\\n'"), Some(Literal::Int(10)));
    assert_eq!(value("'\\''"), Some(Literal::Int(39)));
    assert_eq!(value("'\\0'"), Some(Literal::Int(0)));
}

#[test]
fn string_literals() {
    let tokens = tokens(r#""a \"quoted\" word" x"#);
    assert_eq!(tokens[0].val().kind(), TokenKind::StrConst);
    assert_eq!(tokens[0].val().value(), None);
    assert_eq!(tokens[0].location().lexeme(), r#""a \"quoted\" word""#);
    assert_eq!(tokens[1].val().kind(), TokenKind::Ident);
}

#[test]
fn comments_and_splices() {
    use TokenKind::*;

    assert_eq!(kinds("a /* b\n c */ d"), vec![Ident, Ident, Eoi]);
    assert_eq!(kinds("a // b\nc"), vec![Ident, Ident, Eoi]);
    assert_eq!(kinds("a // b \\\n still comment\nc"), vec![Ident, Ident, Eoi]);
    assert_eq!(kinds("a \\\n b"), vec![Ident, Ident, Eoi]);
    assert_eq!(kinds("a \\ b"), vec![Ident, Backslash, Ident, Eoi]);
}

#[test]
fn preprocessor_directives() {
    use TokenKind::*;

    assert_eq!(kinds("#include <x>"), vec![Include, Lt, Ident, Gt, Eoi]);
    assert_eq!(kinds("#define N 4"), vec![Define, Ident, IntConst, Eoi]);
    assert_eq!(kinds("#defined"), vec![Hash, Ident, Eoi]);
}

#[test]
fn lexical_errors() {
    assert_eq!(error("\"abc"), LexerError::UnterminatedString);
    assert_eq!(error("'a"), LexerError::UnterminatedChar);
    assert_eq!(error("''"), LexerError::EmptyChar);
    assert_eq!(error("/* open"), LexerError::UnterminatedComment);
    assert_eq!(error("// open \\"), LexerError::UnterminatedComment);
    assert_eq!(error("019"), LexerError::InvalidOctalDigit('9'));
    assert_eq!(error("1e+"), LexerError::MalformedExponent);
    assert_eq!(error("1.0ex"), LexerError::MalformedExponent);
    assert_eq!(error("0x"), LexerError::EmptyHex);
    assert_eq!(error("99999999999999999999"), LexerError::IntOverflow);
    assert_eq!(error("int @"), LexerError::BadChar('@'));
    assert_eq!(error("int $x"), LexerError::BadChar('$'));
    assert_eq!(error("int é"), LexerError::BadChar('é'));
    assert_eq!(error("x\x01"), LexerError::BadChar('\u{1}'));
}

#[test]
fn errors_carry_line_numbers() {
    let error = scan(&Source::new("<test>", "int x;\nint y = \"oops;\n")).unwrap_err();

    assert_eq!(error.location().start().line(), 2);
    assert_eq!(error.location().start().column(), 9);
}

#[test]
fn relexing_spans_reproduces_kinds() {
    let text = "int main() {\n  int x = 0x1f; // c\n  x <<= 2;\n  return x >= 3 ? x : -x;\n}\n";

    let original = tokens(text);
    let joined = original
        .iter()
        .map(|token| token.location().lexeme())
        .collect::<Vec<_>>()
        .join(" ");

    let expected: Vec<_> = original.iter().map(|token| token.val().kind()).collect();
    assert_eq!(kinds(&joined), expected);
}
