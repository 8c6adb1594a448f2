//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de ubicaciones en el código
//! fuente original, lo cual permite determinar un punto exacto
//! o aproximado en donde ocurre un error. Una ubicación es un
//! rango de bytes sobre un [`Source`] compartido; las posiciones
//! línea-columna se derivan bajo demanda.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
///
/// La ubicación no participa en comparaciones de igualdad: dos
/// valores ubicados son iguales si sus valores lo son.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: PartialEq> PartialEq for Located<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.value)
    }
}

/// Texto fuente de una unidad de compilación.
///
/// Se conserva el texto completo, ya que los tokens lo referencian
/// por rango en vez de copiar sus lexemas.
pub struct Source {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl Source {
    /// Construye un origen a partir de su nombre y contenido.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        Rc::new(Source {
            name: name.into(),
            text,
            line_starts,
        })
    }

    /// Nombre del origen, típicamente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Invoca a `callback` con el contenido de una línea, sin el salto de línea.
    pub fn with_line<R, F>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let index = (line as usize).saturating_sub(1);
        let text = match self.line_starts.get(index) {
            Some(&start) => {
                let end = self
                    .line_starts
                    .get(index + 1)
                    .map(|next| next - 1)
                    .unwrap_or(self.text.len());

                self.text[start..end].trim_end_matches('\r')
            }

            None => "",
        };

        callback(text)
    }

    /// Convierte un desplazamiento en bytes a una posición línea-columna.
    fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };

        let start = self.line_starts[line];
        let column = self.text[start..offset]
            .chars()
            .fold(Position::default(), |position, c| match c {
                '\t' => position.tab(),
                _ => position.advance(),
            })
            .column;

        Position {
            line: line as u32 + 1,
            column,
        }
    }
}

/// Una ubicación está conformada por un origen y un rango de bytes.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    range: Range<usize>,
}

impl Location {
    /// Construye una ubicación sobre un rango de bytes del origen.
    pub fn new(from: &Rc<Source>, range: Range<usize>) -> Self {
        Location {
            from: Rc::clone(from),
            range,
        }
    }

    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            range: from.range.start..to.range.end.max(from.range.start),
        }
    }

    /// Origen al que pertenece esta ubicación.
    pub fn source(&self) -> &Rc<Source> {
        &self.from
    }

    /// Rango de bytes en el texto fuente.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Fragmento de texto fuente cubierto por esta ubicación.
    pub fn lexeme(&self) -> &str {
        &self.from.text[self.range.clone()]
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.from.position(self.range.start)
    }

    /// Obtiene la posición inmediatamente posterior al final.
    pub fn end(&self) -> Position {
        if self.range.is_empty() {
            self.start().advance()
        } else {
            self.from.position(self.range.end)
        }
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let (start, end) = (self.start(), self.end());
        if end == start.advance() || end.line != start.line {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines_and_tabs() {
        let source = Source::new("<test>", "int x;\n\tint y;\n");

        let x = Location::new(&source, 4..5);
        assert_eq!(x.start().line(), 1);
        assert_eq!(x.start().column(), 5);
        assert_eq!(x.lexeme(), "x");

        let y = Location::new(&source, 12..13);
        assert_eq!(y.start().line(), 2);
        assert_eq!(y.start().column(), 9);
        assert_eq!(y.to_string(), "<test>:2:9");
    }

    #[test]
    fn with_line_strips_terminators() {
        let source = Source::new("<test>", "a\r\nbc\n");
        assert_eq!(source.with_line(1, str::to_owned), "a");
        assert_eq!(source.with_line(2, str::to_owned), "bc");
        assert_eq!(source.with_line(9, str::to_owned), "");
    }

    #[test]
    fn spans_join_locations() {
        let source = Source::new("<test>", "a + b");
        let a = Location::new(&source, 0..1);
        let b = Location::new(&source, 4..5);

        let joined = Location::span(a, &b);
        assert_eq!(joined.lexeme(), "a + b");
        assert_eq!(joined.to_string(), "<test>:[1:1-1:5]");
    }
}
