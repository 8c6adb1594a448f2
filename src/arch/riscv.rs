//! Implementación para una máquina tipo RISC-V.
//!
//! Los temporales se nombran `a1`, `a2`, ... sin límite propio de la
//! arquitectura; la cota la impone el asignador de registros. El valor
//! de retorno va en `a0` y las locales se direccionan relativas a `s0`.

use std::fmt;

/// Tamaño fijo del stack frame, en bytes.
pub const FRAME_SIZE: i32 = 16;

/// Desplazamiento de la primera variable local respecto a `s0`.
pub const SLOT_BASE: i32 = -20;

/// Ancho de cada ranura de variable local, en bytes.
pub const SLOT_WIDTH: i32 = 4;

/// Cantidad máxima de ranuras locales por función.
///
/// El frame de [`FRAME_SIZE`] bytes no las contiene: `-20(s0)` queda
/// por debajo de `sp`, y las ranuras en `-8(s0)` y `-4(s0)` se solapan
/// con el `s0` guardado en `8(sp)`.
pub const SLOTS: u32 = 5;

/// Tamaño de `int`, resultado de `sizeof`.
pub const INT_SIZE: i64 = 4;

/// Registro de procesador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    /// Registros de argumento y temporales, `aN`.
    A(u32),

    /// `x0`, siempre cero.
    Zero,

    /// Frame pointer.
    S0,

    /// Stack pointer.
    Sp,

    /// Dirección de retorno.
    Ra,
}

impl super::Register for Reg {
    const RETURN: Self = Reg::A(0);
    const ZERO: Self = Reg::Zero;

    fn scratch(index: u32) -> Self {
        Reg::A(index)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::A(number) => write!(formatter, "a{}", number),
            Reg::Zero => formatter.write_str("x0"),
            Reg::S0 => formatter.write_str("s0"),
            Reg::Sp => formatter.write_str("sp"),
            Reg::Ra => formatter.write_str("ra"),
        }
    }
}

/// Desplazamiento respecto a `s0` de la ranura local número `slot`.
pub fn slot_offset(slot: u32) -> i32 {
    SLOT_BASE + SLOT_WIDTH * slot as i32
}
