//! Detalles específicos de la arquitectura objetivo.
//!
//! El generador de código solo conoce registros a través del trait
//! [`Register`]; los nombres concretos, el tamaño del stack frame y la
//! disposición de variables locales viven en el submódulo de cada
//! arquitectura.

use std::fmt;

pub mod riscv;

/// Registro de procesador.
pub trait Register: Copy + PartialEq + fmt::Debug + fmt::Display {
    /// Registro en el que se coloca el valor de retorno.
    const RETURN: Self;

    /// Registro que siempre se lee como cero.
    const ZERO: Self;

    /// Registro temporal número `index` del pool, contando desde 1.
    fn scratch(index: u32) -> Self;
}
