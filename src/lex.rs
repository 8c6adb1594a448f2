//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto de un
//! [`Source`] en unidades léxicas denominadas tokens. Los espacios en
//! blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido está asociado a una ubicación en el código fuente
//! original, lo cual permite rastrear errores tanto en los mismos como
//! en constructos más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Un token no copia su lexema: su ubicación es un rango sobre el texto
//! fuente y de ahí se recupera el lexema cuando se necesita. Las constantes
//! literales numéricas y de carácter se resuelven a sus valores durante el
//! escaneo.
//!
//! # Reglas importantes del lenguaje
//! - Siempre se consume el token válido más largo (maximal munch).
//! - `#include` y `#define` se reconocen como tokens, pero no se expanden.
//! - Una constante con `.`, `e` o `E` es de punto flotante; de lo contrario,
//!   un `0` inicial indica octal y `0x` indica hexadecimal.
//!
//! # Errores
//! El lexer no se recupera de errores. Tras el primer error, o tras emitir
//! el token [`TokenKind::Eoi`], el iterador termina.

use crate::source::{Located, Location, Source};
use bitflags::bitflags;
use log::debug;
use std::{
    fmt::{self, Display},
    rc::Rc,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Comentario `/* ... */` o comentario de línea continuado sin cierre.
    #[error("Unterminated comment")]
    UnterminatedComment,

    /// Constante de carácter sin comilla de cierre.
    #[error("Unterminated character constant")]
    UnterminatedChar,

    /// Literal de string sin comilla de cierre.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Constante de carácter sin contenido.
    #[error("Empty character constant")]
    EmptyChar,

    /// Se encontró `8` o `9` en una constante octal.
    #[error("Invalid digit {0:?} in octal constant")]
    InvalidOctalDigit(char),

    /// Prefijo `0x` sin dígitos hexadecimales.
    #[error("Hexadecimal constant has no digits")]
    EmptyHex,

    /// El marcador de exponente no está seguido de signo o dígito.
    #[error("Malformed exponent in floating constant")]
    MalformedExponent,

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {}]", i64::MAX)]
    IntOverflow,
}

bitflags! {
    /// Categorías a las que pertenece un byte de entrada.
    pub struct CharClass: u8 {
        /// Espacio, tabulador, retorno de carro y avances de página.
        const BLANK = 0x01;

        /// `'\n'`.
        const NEWLINE = 0x02;

        /// Letras ASCII y `_`.
        const LETTER = 0x04;

        /// Dígitos decimales.
        const DIGIT = 0x08;

        /// Dígitos hexadecimales.
        const HEX = 0x10;

        /// Puntuación ASCII, candidata a operador o separador.
        const OTHER = 0x20;
    }
}

impl CharClass {
    /// Clasifica un byte.
    pub fn of(byte: u8) -> CharClass {
        CharClass::from_bits_truncate(CLASSES[byte as usize])
    }
}

/// Tabla de clasificación, un conjunto de categorías por byte.
const CLASSES: [u8; 256] = classify_all();

const fn classify_all() -> [u8; 256] {
    let mut table = [0; 256];

    let mut index = 0;
    while index < table.len() {
        let byte = index as u8;
        let mut bits = 0;

        if matches!(byte, b' ' | b'\t' | b'\r' | 0x0b | 0x0c) {
            bits |= CharClass::BLANK.bits();
        }

        if byte == b'\n' {
            bits |= CharClass::NEWLINE.bits();
        }

        if byte.is_ascii_alphabetic() || byte == b'_' {
            bits |= CharClass::LETTER.bits();
        } else if byte.is_ascii_punctuation() {
            bits |= CharClass::OTHER.bits();
        }

        if byte.is_ascii_digit() {
            bits |= CharClass::DIGIT.bits();
        }

        if byte.is_ascii_hexdigit() {
            bits |= CharClass::HEX.bits();
        }

        table[index] = bits;
        index += 1;
    }

    table
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
}

impl Keyword {
    /// Clasifica un término contra el conjunto fijo de palabras clave.
    ///
    /// La búsqueda se despacha por el primer carácter y luego por
    /// longitud, de forma equivalente a un trie de palabras clave.
    pub fn lookup(word: &str) -> Option<Keyword> {
        use Keyword::*;

        let candidates: &[Keyword] = match word.as_bytes().first()? {
            b'a' => &[Auto],
            b'b' => &[Break],
            b'c' => &[Case, Char, Const, Continue],
            b'd' => &[Default, Do, Double],
            b'e' => &[Else, Enum, Extern],
            b'f' => &[Float, For],
            b'g' => &[Goto],
            b'i' => &[If, Inline, Int],
            b'l' => &[Long],
            b'r' => &[Register, Return],
            b's' => &[Short, Signed, Sizeof, Static, Struct, Switch],
            b't' => &[Typedef],
            b'u' => &[Union, Unsigned],
            b'v' => &[Void, Volatile],
            b'w' => &[While],
            _ => return None,
        };

        candidates
            .iter()
            .copied()
            .filter(|keyword| keyword.as_str().len() == word.len())
            .find(|keyword| keyword.as_str() == word)
    }

    /// Ortografía de la palabra clave.
    pub fn as_str(self) -> &'static str {
        use Keyword::*;

        match self {
            Auto     => "auto",
            Break    => "break",
            Case     => "case",
            Char     => "char",
            Const    => "const",
            Continue => "continue",
            Default  => "default",
            Do       => "do",
            Double   => "double",
            Else     => "else",
            Enum     => "enum",
            Extern   => "extern",
            Float    => "float",
            For      => "for",
            Goto     => "goto",
            If       => "if",
            Inline   => "inline",
            Int      => "int",
            Long     => "long",
            Register => "register",
            Return   => "return",
            Short    => "short",
            Signed   => "signed",
            Sizeof   => "sizeof",
            Static   => "static",
            Struct   => "struct",
            Switch   => "switch",
            Typedef  => "typedef",
            Union    => "union",
            Unsigned => "unsigned",
            Void     => "void",
            Volatile => "volatile",
            While    => "while",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Clase de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Palabra clave.
    Keyword(Keyword),

    /// Identificador.
    Ident,

    /// Constante entera, incluyendo constantes hexadecimales y octales.
    IntConst,

    /// Constante de punto flotante con sufijo `f`.
    FloatConst,

    /// Constante de punto flotante sin sufijo.
    DoubleConst,

    /// Constante de punto flotante con sufijo `l`.
    LongDoubleConst,

    /// Constante de carácter.
    CharConst,

    /// Literal de string.
    StrConst,

    /// `#include`
    Include,

    /// `#define`
    Define,

    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `->`
    Arrow,
    /// `--`
    Decr,
    /// `++`
    Incr,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
    /// `<<=`
    LShiftAssign,
    /// `>>=`
    RShiftAssign,
    /// `&=`
    AndAssign,
    /// `|=`
    OrAssign,
    /// `^=`
    XorAssign,
    /// `||`
    OrOr,
    /// `&&`
    AndAnd,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `~`
    Tilde,
    /// `!`
    Not,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `[`
    OpenSquare,
    /// `]`
    CloseSquare,
    /// `{`
    OpenCurly,
    /// `}`
    CloseCurly,
    /// `#`
    Hash,
    /// `##`
    HashHash,
    /// `\`
    Backslash,

    /// Fin de entrada. Siempre es el último token.
    Eoi,
}

impl TokenKind {
    /// Nombre corto, en mayúsculas, para volcados de depuración.
    pub fn name(self) -> &'static str {
        use TokenKind::*;

        match self {
            Keyword(keyword) => keyword_name(keyword),
            Ident           => "IDENT",
            IntConst        => "INTCONST",
            FloatConst      => "FLOATCONST",
            DoubleConst     => "DOUBLECONST",
            LongDoubleConst => "LONGDOUBLECONST",
            CharConst       => "CHARCONST",
            StrConst        => "STRCONST",
            Include         => "INCLUDE",
            Define          => "DEFINE",
            Lt              => "LT",
            Gt              => "GT",
            Leq             => "LEQ",
            Geq             => "GEQ",
            LShift          => "LSHIFT",
            RShift          => "RSHIFT",
            Arrow           => "DEREF",
            Decr            => "DECR",
            Incr            => "INCR",
            Eq              => "EQ",
            Neq             => "NEQ",
            Add             => "ADD",
            Sub             => "SUB",
            Mul             => "MUL",
            Div             => "DIV",
            Mod             => "MOD",
            Assign          => "ASSIGN",
            AddAssign       => "ADDASSIGN",
            SubAssign       => "SUBASSIGN",
            MulAssign       => "MULASSIGN",
            DivAssign       => "DIVASSIGN",
            ModAssign       => "MODASSIGN",
            LShiftAssign    => "LSHIFTASSIGN",
            RShiftAssign    => "RSHIFTASSIGN",
            AndAssign       => "ANDASSIGN",
            OrAssign        => "ORASSIGN",
            XorAssign       => "XORASSIGN",
            OrOr            => "OROR",
            AndAnd          => "ANDAND",
            And             => "AND",
            Or              => "OR",
            Xor             => "XOR",
            Tilde           => "TILDA",
            Not             => "NOT",
            Question        => "QMARK",
            Colon           => "COLON",
            Semicolon       => "SEMIC",
            Comma           => "COMMA",
            Dot             => "DOT",
            Ellipsis        => "ELLIPSIS",
            OpenParen       => "OPAR",
            CloseParen      => "CPAR",
            OpenSquare      => "OBR",
            CloseSquare     => "CBR",
            OpenCurly       => "OCBR",
            CloseCurly      => "CCBR",
            Hash            => "STRGIZE",
            HashHash        => "TKPASTE",
            Backslash       => "BACKSLASH",
            Eoi             => "EOI",
        }
    }

    /// Ortografía fija de puntuación, si la hay.
    fn punctuation(self) -> Option<&'static str> {
        use TokenKind::*;

        let spelling = match self {
            Lt           => "<",
            Gt           => ">",
            Leq          => "<=",
            Geq          => ">=",
            LShift       => "<<",
            RShift       => ">>",
            Arrow        => "->",
            Decr         => "--",
            Incr         => "++",
            Eq           => "==",
            Neq          => "!=",
            Add          => "+",
            Sub          => "-",
            Mul          => "*",
            Div          => "/",
            Mod          => "%",
            Assign       => "=",
            AddAssign    => "+=",
            SubAssign    => "-=",
            MulAssign    => "*=",
            DivAssign    => "/=",
            ModAssign    => "%=",
            LShiftAssign => "<<=",
            RShiftAssign => ">>=",
            AndAssign    => "&=",
            OrAssign     => "|=",
            XorAssign    => "^=",
            OrOr         => "||",
            AndAnd       => "&&",
            And          => "&",
            Or           => "|",
            Xor          => "^",
            Tilde        => "~",
            Not          => "!",
            Question     => "?",
            Colon        => ":",
            Semicolon    => ";",
            Comma        => ",",
            Dot          => ".",
            Ellipsis     => "...",
            OpenParen    => "(",
            CloseParen   => ")",
            OpenSquare   => "[",
            CloseSquare  => "]",
            OpenCurly    => "{",
            CloseCurly   => "}",
            Hash         => "#",
            HashHash     => "##",
            Backslash    => "\\",
            Include      => "#include",
            Define       => "#define",
            _ => return None,
        };

        Some(spelling)
    }
}

fn keyword_name(keyword: Keyword) -> &'static str {
    use Keyword::*;

    match keyword {
        Auto     => "AUTO",
        Break    => "BREAK",
        Case     => "CASE",
        Char     => "CHAR",
        Const    => "CONST",
        Continue => "CONTINUE",
        Default  => "DEFAULT",
        Do       => "DO",
        Double   => "DOUBLE",
        Else     => "ELSE",
        Enum     => "ENUM",
        Extern   => "EXTERN",
        Float    => "FLOAT",
        For      => "FOR",
        Goto     => "GOTO",
        If       => "IF",
        Inline   => "INLINE",
        Int      => "INT",
        Long     => "LONG",
        Register => "REGISTER",
        Return   => "RETURN",
        Short    => "SHORT",
        Signed   => "SIGNED",
        Sizeof   => "SIZEOF",
        Static   => "STATIC",
        Struct   => "STRUCT",
        Switch   => "SWITCH",
        Typedef  => "TYPEDEF",
        Union    => "UNION",
        Unsigned => "UNSIGNED",
        Void     => "VOID",
        Volatile => "VOLATILE",
        While    => "WHILE",
    }
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        if let Some(spelling) = self.punctuation() {
            return write!(fmt, "`{}`", spelling);
        }

        match self {
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Ident => fmt.write_str("identifier"),
            IntConst => fmt.write_str("integer constant"),
            FloatConst | DoubleConst | LongDoubleConst => fmt.write_str("floating constant"),
            CharConst => fmt.write_str("character constant"),
            StrConst => fmt.write_str("string literal"),
            _ => fmt.write_str("end of input"),
        }
    }
}

/// Valor decodificado de una constante literal.
///
/// Las variantes son mutuamente excluyentes según la clase del token.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f32),
    Double(f64),

    /// No existe un tipo estable de precisión extendida, se aproxima con `f64`.
    LongDouble(f64),
}

impl Display for Literal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(fmt, "{}", value),
            Literal::Float(value) => write!(fmt, "{}", value),
            Literal::Double(value) => write!(fmt, "{}", value),
            Literal::LongDouble(value) => write!(fmt, "{}", value),
        }
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene su clase y, para constantes, su valor decodificado.
/// El lexema se obtiene de la ubicación del [`Located<Token>`] que lo
/// envuelve.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    value: Option<Literal>,
}

impl Token {
    /// Construye un token.
    pub fn new(kind: TokenKind, value: Option<Literal>) -> Self {
        Token { kind, value }
    }

    /// Clase del token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Valor decodificado, solo presente en constantes.
    pub fn value(&self) -> Option<Literal> {
        self.value
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(fmt, "{}({})", self.kind.name(), value),
            None => fmt.write_str(self.kind.name()),
        }
    }
}

/// Escanea por completo un origen.
///
/// El resultado siempre termina en [`TokenKind::Eoi`]. Se aborta en el
/// primer error léxico.
pub fn scan(source: &Rc<Source>) -> Result<Vec<Located<Token>>, Located<LexerError>> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    debug!("{}: scanned {} tokens", source.name(), tokens.len());

    Ok(tokens)
}

/// Lexer de maximal munch sobre un texto fuente.
pub struct Lexer {
    source: Rc<Source>,
    position: usize,
    state: State,
}

/// Posibles estados del lexer.
enum State {
    /// Aún hay entrada por escanear.
    Scanning,

    /// Ya se emitió el fin de entrada o un error.
    Done,
}

type Lex<T> = Result<T, Located<LexerError>>;

impl Lexer {
    /// Crea un lexer en estado inicial a partir de un origen.
    pub fn new(source: &Rc<Source>) -> Self {
        Lexer {
            source: Rc::clone(source),
            position: 0,
            state: State::Scanning,
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Lex<Located<Token>> {
        self.skip_trivia()?;

        let start = self.position;
        let byte = match self.peek(0) {
            Some(byte) => byte,
            None => {
                self.state = State::Done;
                return Ok(self.token(TokenKind::Eoi, None, start));
            }
        };

        let class = CharClass::of(byte);
        let (kind, value) = if class.contains(CharClass::LETTER) {
            self.word()
        } else if class.contains(CharClass::DIGIT)
            || (byte == b'.' && self.class_at(1).contains(CharClass::DIGIT))
        {
            self.number()?
        } else if byte == b'\'' {
            self.character()?
        } else if byte == b'"' {
            self.string()?
        } else if class.contains(CharClass::OTHER) {
            (self.punctuation()?, None)
        } else {
            return self.bad_char(start);
        };

        Ok(self.token(kind, value, start))
    }

    /// Descarta espacios en blanco, empalmes de línea y comentarios.
    fn skip_trivia(&mut self) -> Lex<()> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(byte), _) if CharClass::of(byte).intersects(CharClass::BLANK | CharClass::NEWLINE) => {
                    self.position += 1;
                }

                (Some(b'\\'), Some(b'\n')) => self.position += 2,
                (Some(b'\\'), Some(b'\r')) if self.peek(2) == Some(b'\n') => self.position += 3,

                (Some(b'/'), Some(b'*')) => self.block_comment()?,
                (Some(b'/'), Some(b'/')) => self.line_comment()?,

                _ => break Ok(()),
            }
        }
    }

    /// Comentario `/* ... */`, que puede abarcar varias líneas.
    fn block_comment(&mut self) -> Lex<()> {
        let start = self.position;
        match self.rest()[2..].find("*/") {
            Some(offset) => {
                self.position += 2 + offset + 2;
                Ok(())
            }

            None => self.fail(LexerError::UnterminatedComment, start, start + 2),
        }
    }

    /// Comentario de línea, posiblemente continuado con `\` al final de la línea.
    fn line_comment(&mut self) -> Lex<()> {
        let start = self.position;
        self.position += 2;

        loop {
            let rest = self.rest();
            let (line, next) = match rest.find('\n') {
                Some(offset) => (&rest[..offset], Some(self.position + offset + 1)),
                None => (rest, None),
            };

            let continued = line.trim_end_matches('\r').ends_with('\\');
            match next {
                Some(next) => {
                    self.position = next;
                    if !continued {
                        break Ok(());
                    }
                }

                None => {
                    self.position = self.source.text().len();
                    if continued {
                        break self.fail(LexerError::UnterminatedComment, start, start + 2);
                    }

                    break Ok(());
                }
            }
        }
    }

    /// Identificadores y palabras clave.
    fn word(&mut self) -> (TokenKind, Option<Literal>) {
        let start = self.position;
        self.consume_while(CharClass::LETTER | CharClass::DIGIT);

        let word = &self.source.text()[start..self.position];
        let kind = match Keyword::lookup(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident,
        };

        (kind, None)
    }

    /// Constantes numéricas enteras y de punto flotante.
    fn number(&mut self) -> Lex<(TokenKind, Option<Literal>)> {
        let start = self.position;

        if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x') | Some(b'X')) {
            self.position += 2;
            let digits = self.position;
            self.consume_while(CharClass::HEX);

            if digits == self.position {
                return self.fail(LexerError::EmptyHex, start, self.position);
            }

            let value = self.integer_value(digits, 16)?;
            self.integer_suffix();

            return Ok((TokenKind::IntConst, Some(Literal::Int(value))));
        }

        self.consume_while(CharClass::DIGIT);
        if matches!(self.peek(0), Some(b'.') | Some(b'e') | Some(b'E')) {
            return self.floating(start);
        }

        let digits = &self.source.text()[start..self.position];
        let value = if digits.len() > 1 && digits.starts_with('0') {
            if let Some(offset) = digits.find(|c| c == '8' || c == '9') {
                let at = start + offset;
                let digit = char::from(self.source.text().as_bytes()[at]);
                return self.fail(LexerError::InvalidOctalDigit(digit), at, at + 1);
            }

            self.integer_value(start + 1, 8)?
        } else {
            self.integer_value(start, 10)?
        };

        self.integer_suffix();
        Ok((TokenKind::IntConst, Some(Literal::Int(value))))
    }

    /// Decodifica dígitos ya validados desde `from` hasta la posición actual.
    fn integer_value(&mut self, from: usize, radix: u32) -> Lex<i64> {
        let digits = &self.source.text()[from..self.position];
        match i64::from_str_radix(digits, radix) {
            Ok(value) => Ok(value),
            Err(_) => self.fail(LexerError::IntOverflow, from, self.position),
        }
    }

    /// Sufijos `u`/`U` y `l`/`L` en cualquier orden.
    fn integer_suffix(&mut self) {
        let unsigned = self.eat(b"uU");
        if self.eat(b"lL") {
            self.eat(b"lL");
        }

        if !unsigned {
            self.eat(b"uU");
        }
    }

    /// Parte fraccionaria, exponente y sufijo de una constante flotante.
    fn floating(&mut self, start: usize) -> Lex<(TokenKind, Option<Literal>)> {
        if self.eat(b".") {
            self.consume_while(CharClass::DIGIT);
        }

        if matches!(self.peek(0), Some(b'e') | Some(b'E')) {
            let marker = self.position;
            self.position += 1;
            self.eat(b"+-");

            if !self.class_at(0).contains(CharClass::DIGIT) {
                return self.fail(LexerError::MalformedExponent, marker, self.position);
            }

            self.consume_while(CharClass::DIGIT);
        }

        let end = self.position;
        let value: f64 = match self.source.text()[start..end].parse() {
            Ok(value) => value,
            Err(_) => return self.fail(LexerError::MalformedExponent, start, end),
        };

        let token = if self.eat(b"fF") {
            (TokenKind::FloatConst, Literal::Float(value as f32))
        } else if self.eat(b"lL") {
            (TokenKind::LongDoubleConst, Literal::LongDouble(value))
        } else {
            (TokenKind::DoubleConst, Literal::Double(value))
        };

        Ok((token.0, Some(token.1)))
    }

    /// Constante de carácter, cuyo valor es el código del primer carácter.
    fn character(&mut self) -> Lex<(TokenKind, Option<Literal>)> {
        let start = self.position;
        self.quoted(b'\'', LexerError::UnterminatedChar)?;

        let body = &self.source.text()[start + 1..self.position - 1];
        let mut chars = body.chars();
        let value = match chars.next() {
            None => return self.fail(LexerError::EmptyChar, start, self.position),
            Some('\\') => match chars.next() {
                Some('n') => '\n' as i64,
                Some('t') => '\t' as i64,
                Some('r') => '\r' as i64,
                Some('0') => 0,
                Some('a') => 0x07,
                Some('b') => 0x08,
                Some('f') => 0x0c,
                Some('v') => 0x0b,
                Some(other) => other as i64,
                None => '\\' as i64,
            },

            Some(c) => c as i64,
        };

        Ok((TokenKind::CharConst, Some(Literal::Int(value))))
    }

    /// Literal de string. No se decodifica su contenido.
    fn string(&mut self) -> Lex<(TokenKind, Option<Literal>)> {
        self.quoted(b'"', LexerError::UnterminatedString)?;
        Ok((TokenKind::StrConst, None))
    }

    /// Avanza hasta la comilla de cierre sin escapar.
    fn quoted(&mut self, quote: u8, error: LexerError) -> Lex<()> {
        let start = self.position;
        let length = self.source.text().len();
        self.position += 1;

        loop {
            match self.peek(0) {
                None => break self.fail(error, start, start + 1),
                Some(b'\\') => self.position = (self.position + 2).min(length),
                Some(byte) if byte == quote => {
                    self.position += 1;
                    break Ok(());
                }

                Some(_) => self.position += 1,
            }
        }
    }

    /// Puntuación, con extensión explícita al token más largo posible.
    fn punctuation(&mut self) -> Lex<TokenKind> {
        use TokenKind::*;

        let start = self.position;
        let (kind, length) = match (self.peek(0), self.peek(1), self.peek(2)) {
            (Some(b'<'), Some(b'<'), Some(b'=')) => (LShiftAssign, 3),
            (Some(b'<'), Some(b'<'), _) => (LShift, 2),
            (Some(b'<'), Some(b'='), _) => (Leq, 2),
            (Some(b'<'), Some(b':'), _) => (OpenSquare, 2),
            (Some(b'<'), Some(b'%'), _) => (OpenCurly, 2),
            (Some(b'<'), _, _) => (Lt, 1),

            (Some(b'>'), Some(b'>'), Some(b'=')) => (RShiftAssign, 3),
            (Some(b'>'), Some(b'>'), _) => (RShift, 2),
            (Some(b'>'), Some(b'='), _) => (Geq, 2),
            (Some(b'>'), _, _) => (Gt, 1),

            (Some(b'-'), Some(b'>'), _) => (Arrow, 2),
            (Some(b'-'), Some(b'-'), _) => (Decr, 2),
            (Some(b'-'), Some(b'='), _) => (SubAssign, 2),
            (Some(b'-'), _, _) => (Sub, 1),

            (Some(b'+'), Some(b'+'), _) => (Incr, 2),
            (Some(b'+'), Some(b'='), _) => (AddAssign, 2),
            (Some(b'+'), _, _) => (Add, 1),

            (Some(b'*'), Some(b'='), _) => (MulAssign, 2),
            (Some(b'*'), _, _) => (Mul, 1),

            (Some(b'/'), Some(b'='), _) => (DivAssign, 2),
            (Some(b'/'), _, _) => (Div, 1),

            (Some(b'%'), Some(b'='), _) => (ModAssign, 2),
            (Some(b'%'), Some(b'>'), _) => (CloseCurly, 2),
            (Some(b'%'), Some(b':'), Some(b'%')) if self.peek(3) == Some(b':') => (HashHash, 4),
            (Some(b'%'), Some(b':'), _) => (Hash, 2),
            (Some(b'%'), _, _) => (Mod, 1),

            (Some(b'='), Some(b'='), _) => (Eq, 2),
            (Some(b'='), _, _) => (Assign, 1),

            (Some(b'!'), Some(b'='), _) => (Neq, 2),
            (Some(b'!'), _, _) => (Not, 1),

            (Some(b'&'), Some(b'&'), _) => (AndAnd, 2),
            (Some(b'&'), Some(b'='), _) => (AndAssign, 2),
            (Some(b'&'), _, _) => (And, 1),

            (Some(b'|'), Some(b'|'), _) => (OrOr, 2),
            (Some(b'|'), Some(b'='), _) => (OrAssign, 2),
            (Some(b'|'), _, _) => (Or, 1),

            (Some(b'^'), Some(b'='), _) => (XorAssign, 2),
            (Some(b'^'), _, _) => (Xor, 1),

            (Some(b'.'), Some(b'.'), Some(b'.')) => (Ellipsis, 3),
            (Some(b'.'), _, _) => (Dot, 1),

            (Some(b':'), Some(b'>'), _) => (CloseSquare, 2),
            (Some(b':'), _, _) => (Colon, 1),

            (Some(b'#'), Some(b'#'), _) => (HashHash, 2),
            (Some(b'#'), _, _) => self.directive(),

            (Some(b'?'), _, _) => (Question, 1),
            (Some(b';'), _, _) => (Semicolon, 1),
            (Some(b','), _, _) => (Comma, 1),
            (Some(b'~'), _, _) => (Tilde, 1),
            (Some(b'('), _, _) => (OpenParen, 1),
            (Some(b')'), _, _) => (CloseParen, 1),
            (Some(b'['), _, _) => (OpenSquare, 1),
            (Some(b']'), _, _) => (CloseSquare, 1),
            (Some(b'{'), _, _) => (OpenCurly, 1),
            (Some(b'}'), _, _) => (CloseCurly, 1),
            (Some(b'\\'), _, _) => (Backslash, 1),

            _ => return self.bad_char(start),
        };

        self.position += length;
        Ok(kind)
    }

    /// `#` seguido inmediatamente de `include` o `define`.
    fn directive(&self) -> (TokenKind, usize) {
        let after = &self.rest()[1..];
        let directives = [("include", TokenKind::Include), ("define", TokenKind::Define)];

        for (word, kind) in directives.iter() {
            let boundary = after
                .as_bytes()
                .get(word.len())
                .map_or(true, |&byte| !CharClass::of(byte).intersects(CharClass::LETTER | CharClass::DIGIT));

            if after.starts_with(word) && boundary {
                return (*kind, 1 + word.len());
            }
        }

        (TokenKind::Hash, 1)
    }

    fn bad_char<T>(&mut self, start: usize) -> Lex<T> {
        let bad = self.rest().chars().next().unwrap_or('\0');
        self.fail(LexerError::BadChar(bad), start, start + bad.len_utf8())
    }

    fn token(&self, kind: TokenKind, value: Option<Literal>, start: usize) -> Located<Token> {
        let location = Location::new(&self.source, start..self.position);
        Located::at(Token::new(kind, value), location)
    }

    fn fail<T>(&mut self, error: LexerError, from: usize, to: usize) -> Lex<T> {
        self.state = State::Done;

        let location = Location::new(&self.source, from..to);
        Err(Located::at(error, location))
    }

    fn rest(&self) -> &str {
        &self.source.text()[self.position..]
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.source.text().as_bytes().get(self.position + ahead).copied()
    }

    fn class_at(&self, ahead: usize) -> CharClass {
        self.peek(ahead).map_or(CharClass::empty(), CharClass::of)
    }

    fn consume_while(&mut self, class: CharClass) {
        while self.class_at(0).intersects(class) {
            self.position += 1;
        }
    }

    /// Consume el siguiente byte si es alguno de `options`.
    fn eat(&mut self, options: &[u8]) -> bool {
        match self.peek(0) {
            Some(byte) if options.contains(&byte) => {
                self.position += 1;
                true
            }

            _ => false,
        }
    }
}

impl Iterator for Lexer {
    type Item = Lex<Located<Token>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Done => None,
            State::Scanning => Some(self.lex()),
        }
    }
}
