//! Asignación de registros temporales.
//!
//! [`Allocator`] es el punto de extensión para otras estrategias de
//! asignación. La única implementación, [`Stack`], es un pool LIFO: solo
//! es correcta mientras los registros se liberen en orden inverso al de
//! adquisición, tal como ocurre en un recorrido post-orden de un árbol de
//! expresiones. Evaluación en cortocircuito o derrame de argumentos de
//! llamadas rompen ese anidamiento y requerirían otro asignador.

use super::CodegenError;
use crate::arch::Register;
use log::trace;
use std::marker::PhantomData;

/// Estrategia de asignación de registros temporales.
pub trait Allocator {
    type Register: Register;

    /// Obtiene un registro libre.
    fn acquire(&mut self) -> Result<Self::Register, CodegenError>;

    /// Devuelve un registro al pool.
    fn release(&mut self, reg: Self::Register);

    /// Cantidad de registros actualmente adquiridos.
    fn in_use(&self) -> u32;
}

/// Pool LIFO acotado de registros temporales.
pub struct Stack<R> {
    next: u32,
    limit: u32,
    _register: PhantomData<R>,
}

impl<R: Register> Stack<R> {
    /// Crea un pool que admite hasta `limit` registros simultáneos.
    pub fn new(limit: u32) -> Self {
        Stack {
            next: 1,
            limit,
            _register: PhantomData,
        }
    }
}

impl<R: Register> Allocator for Stack<R> {
    type Register = R;

    fn acquire(&mut self) -> Result<R, CodegenError> {
        if self.next > self.limit {
            return Err(CodegenError::TooManyRegisters);
        }

        let reg = R::scratch(self.next);
        self.next += 1;

        trace!("acquire {}", reg);
        Ok(reg)
    }

    fn release(&mut self, reg: R) {
        debug_assert!(self.next > 1, "release of {} with an empty pool", reg);
        debug_assert_eq!(reg, R::scratch(self.next - 1), "out-of-order register release");

        self.next -= 1;
        trace!("release {}", reg);
    }

    fn in_use(&self) -> u32 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv::Reg;

    #[test]
    fn lifo_reuses_names() {
        let mut regs = Stack::<Reg>::new(99);

        let a = regs.acquire().unwrap();
        let b = regs.acquire().unwrap();
        assert_eq!((a, b), (Reg::A(1), Reg::A(2)));

        regs.release(b);
        assert_eq!(regs.acquire().unwrap(), Reg::A(2));
        assert_eq!(regs.in_use(), 2);
    }

    #[test]
    fn bounded_pool() {
        let mut regs = Stack::<Reg>::new(2);
        regs.acquire().unwrap();
        regs.acquire().unwrap();

        assert!(matches!(regs.acquire(), Err(CodegenError::TooManyRegisters)));
    }
}
