use ganymede::{
    codegen::{CodegenError, Options},
    compile, compile_with,
    error::{CompileError, Diagnostics},
    lex::LexerError,
    parse::ParserError,
};

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

#[test]
fn compiles_a_small_program() {
    init_logger();

    let output = compile("<test>", "int main() {\n  int a = 2, b = 3;\n  return a * b;\n}\n").unwrap();

    assert!(output.starts_with("  .globl main\nmain:\n"));
    assert!(output.contains("  mul     a1,a2,a3\n"));
    assert!(output.contains("  mv      a0,a1\n"));
    assert!(output.ends_with("  jr      ra\n"));
}

#[test]
fn empty_source_yields_empty_output() {
    assert_eq!(compile("<test>", "").unwrap(), "");
    assert_eq!(compile("<test>", "// nothing\n").unwrap(), "");
}

#[test]
fn options_reach_codegen() {
    let text = "int f() { return 1 + 2; }";

    let error = compile_with("<test>", text, &Options { registers: 2 }).unwrap_err();
    assert!(matches!(&error, CompileError::Codegen(inner) if *inner.val() == CodegenError::TooManyRegisters));
    assert_eq!(error.kind(), "Codegen error");
}

#[test]
fn each_phase_reports_its_kind() {
    let lexical = compile("<test>", "int f() { return @; }").unwrap_err();
    assert!(matches!(&lexical, CompileError::Lex(inner) if *inner.val() == LexerError::BadChar('@')));
    assert_eq!(lexical.kind(), "Lexical error");

    let syntax = compile("<test>", "int f() { return 1 }").unwrap_err();
    assert!(matches!(&syntax, CompileError::Parse(inner) if matches!(inner.val(), ParserError::UnexpectedToken { .. })));
    assert_eq!(syntax.kind(), "Syntax error");

    let codegen = compile("<test>", "int f() { return y; }").unwrap_err();
    assert_eq!(codegen.kind(), "Codegen error");
    assert_eq!(codegen.to_string(), "Undefined variable `y`");
}

#[test]
fn lexical_errors_stop_before_parsing() {
    // La sintaxis también es inválida, pero el error léxico llega primero
    let error = compile("<test>", "int ( \"open").unwrap_err();
    assert!(matches!(error, CompileError::Lex(_)));
}

#[test]
fn diagnostics_point_at_the_error() {
    let error = compile("prog.c", "int f() {\n  return y;\n}\n").unwrap_err();

    let location = error.location();
    assert_eq!(location.start().line(), 2);
    assert_eq!(location.start().column(), 10);

    let kind = error.kind();
    let report = Diagnostics::from(error).kind(kind).to_string();

    assert!(report.starts_with("Codegen error: Undefined variable `y`\n"));
    assert!(report.contains(" --> prog.c:2:10\n"));
    assert!(report.contains("\n  |\n2 |   return y;\n  |          ^\n\n"));
    assert!(report.ends_with("Build failed with 1 error\n"));
}

#[test]
fn empty_diagnostics() {
    let report = Diagnostics::default().to_string();
    assert_eq!(report, "No errors were reported\n");
}
