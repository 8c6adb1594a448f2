//! Errores de compilación y su presentación.
//!
//! Cada fase reporta su propio tipo de error, siempre envuelto en un
//! [`Located`]. [`CompileError`] los unifica para quien invoca la
//! pipeline completa, y [`Diagnostics`] los presenta junto con el
//! fragmento de código fuente donde ocurrieron.

use crate::{
    codegen::CodegenError,
    lex::LexerError,
    parse::ParserError,
    source::{Located, Location},
};

use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;

mod sealed {
    pub trait Sealed {}
}

/// Un error asociado a una ubicación en el código fuente.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Primer error de cualquier fase de la pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{}", .0.val())]
    Lex(Located<LexerError>),

    #[error("{}", .0.val())]
    Parse(Located<ParserError>),

    #[error("{}", .0.val())]
    Codegen(Located<CodegenError>),
}

impl CompileError {
    /// Descripción corta de la fase que falló.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex(_) => "Lexical error",
            CompileError::Parse(_) => "Syntax error",
            CompileError::Codegen(_) => "Codegen error",
        }
    }

    /// Ubicación del error.
    pub fn location(&self) -> &Location {
        match self {
            CompileError::Lex(error) => error.location(),
            CompileError::Parse(error) => error.location(),
            CompileError::Codegen(error) => error.location(),
        }
    }
}

impl From<Located<LexerError>> for CompileError {
    fn from(error: Located<LexerError>) -> Self {
        CompileError::Lex(error)
    }
}

impl From<Located<ParserError>> for CompileError {
    fn from(error: Located<ParserError>) -> Self {
        CompileError::Parse(error)
    }
}

impl From<Located<CodegenError>> for CompileError {
    fn from(error: Located<CodegenError>) -> Self {
        CompileError::Codegen(error)
    }
}

/// Reporte legible de uno o más errores.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let (start, end) = (location.start(), location.end());
            let digits = end.line().to_string().len();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in start.line()..=end.line() {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            let (from, to) = (start.column(), end.column().saturating_sub(1).max(1));
            let min = from.min(to);
            let max = from.max(to);

            let skip = (min - 1) as usize;
            let highlight = (max - min + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

impl sealed::Sealed for CompileError {}

impl LocatedError for CompileError {
    fn source(&self) -> &dyn Error {
        self
    }

    fn location(&self) -> &Location {
        CompileError::location(self)
    }
}
