//! Tabla de símbolos.
//!
//! Tabla hash genérica indexada por strings, con direccionamiento
//! abierto y sondeo lineal. La capacidad se duplica en cuanto la
//! ocupación alcanza la mitad, de modo que siempre existe una ranura
//! vacía que termina cada sondeo.

use std::{fmt, rc::Rc};

/// Capacidad inicial, siempre una potencia de dos.
const INITIAL_CAPACITY: usize = 16;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash FNV-1a de 64 bits.
fn hash(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Tabla asociativa de llaves string a valores `V`.
pub struct Table<V> {
    slots: Vec<Option<(Rc<str>, V)>>,
    length: usize,
}

impl<V> Table<V> {
    /// Crea una tabla vacía.
    pub fn new() -> Self {
        Table {
            slots: Self::empty_slots(INITIAL_CAPACITY),
            length: 0,
        }
    }

    /// Cantidad de llaves distintas.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Número de ranuras reservadas.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let index = self.probe(key);
        self.slots[index].as_ref().map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let index = self.probe(key);
        self.slots[index].as_mut().map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserta o sobrescribe una entrada.
    ///
    /// Si la llave ya estaba presente, se retorna el valor anterior.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        let mut index = self.probe(key);
        if let Some((_, old)) = &mut self.slots[index] {
            return Some(std::mem::replace(old, value));
        }

        if 2 * (self.length + 1) >= self.slots.len() {
            self.grow();
            index = self.probe(key);
        }

        self.slots[index] = Some((Rc::from(key), value));
        self.length += 1;

        None
    }

    /// Recorre todas las entradas en orden de ranura, no de inserción.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Ranura donde se encuentra `key`, o la ranura vacía donde iría.
    fn probe(&self, key: &str) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = hash(key) as usize & mask;

        loop {
            match &self.slots[index] {
                Some((existing, _)) if &**existing != key => index = (index + 1) & mask,
                _ => break index,
            }
        }
    }

    fn grow(&mut self) {
        let capacity = 2 * self.slots.len();
        let old = std::mem::replace(&mut self.slots, Self::empty_slots(capacity));

        for (key, value) in old.into_iter().flatten() {
            let index = self.probe(&key);
            self.slots[index] = Some((key, value));
        }
    }

    fn empty_slots(capacity: usize) -> Vec<Option<(Rc<str>, V)>> {
        std::iter::repeat_with(|| None).take(capacity).collect()
    }
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Table::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Table<V> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a Table<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterador sobre las entradas de una [`Table`].
pub struct Iter<'a, V> {
    slots: std::slice::Iter<'a, Option<(Rc<str>, V)>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .by_ref()
            .flatten()
            .next()
            .map(|(key, value)| (&**key, value))
    }
}
