//! Compilador ahead-of-time para un subconjunto de C.
//!
//! # Pipeline
//! La compilación es lineal y de una sola pasada por fase. El texto
//! fuente se somete primero a análisis léxico en [`lex`], de lo cual se
//! obtiene un flujo de tokens terminado en fin de entrada. El flujo de
//! tokens se dispone en un AST, descrito en [`ast`], por medio de
//! análisis sintáctico en [`parse`]. Finalmente, [`codegen`] recorre el
//! árbol, resuelve variables a ranuras del stack frame mediante la tabla
//! de símbolos de [`table`] y emite ensamblador para una máquina tipo
//! RISC-V.
//!
//! # Errores
//! Cada fase falla en su primer error. Los errores son valores tipados
//! con ubicación; ningún error termina el proceso desde la biblioteca.
//! Ver [`error`].

#[macro_use]
mod macros;

pub mod arch;
pub mod ast;
pub mod codegen;
pub mod dump;
pub mod error;
pub mod lex;
pub mod parse;
pub mod source;
pub mod table;

use crate::{codegen::Options, error::CompileError, source::Source};

/// Compila un texto fuente con las opciones por defecto.
pub fn compile(name: &str, text: &str) -> Result<String, CompileError> {
    compile_with(name, text, &Options::default())
}

/// Compila un texto fuente completo a ensamblador.
pub fn compile_with(name: &str, text: &str, options: &Options) -> Result<String, CompileError> {
    let source = Source::new(name, text);

    let tokens = lex::scan(&source)?;
    let program = parse::parse(&tokens)?;
    let assembly = codegen::generate(&program, options)?;

    Ok(assembly)
}
