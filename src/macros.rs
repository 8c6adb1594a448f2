/// Emite una línea de instrucción en el listado de un generador.
///
/// El mnemónico se alinea en un campo de 8 columnas y los operandos se
/// formatean como en `format!()`.
macro_rules! emit {
    ($cx:expr, $opcode:expr, $($format:tt)*) => {
        $cx.line(format_args!("  {:8}{}", $opcode, format_args!($($format)*)))
    };
}
