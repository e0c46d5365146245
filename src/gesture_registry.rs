use thiserror::Error;

use crate::types::{GestureEvent, GestureSymbol, UnknownGesture};

/// Callback ejecutado cuando un gesto aparece o desaparece
pub type GestureCallback = Box<dyn FnMut(&GestureEvent)>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    UnknownGesture(#[from] UnknownGesture),
}

/// Tabla gesto -> callback, una entrada por símbolo
pub struct GestureRegistry {
    slots: [Option<GestureCallback>; GestureSymbol::COUNT],
}

impl GestureRegistry {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Registra (o reemplaza) el callback de un gesto
    pub fn register<F>(&mut self, symbol: GestureSymbol, callback: F)
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        self.slots[symbol.index()] = Some(Box::new(callback));
    }

    /// Igual que `register` pero por nombre externo ("fist", "open_palm", ...)
    pub fn register_gesture<F>(&mut self, name: &str, callback: F) -> Result<(), RegistryError>
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        let symbol: GestureSymbol = name.parse()?;
        self.register(symbol, callback);
        Ok(())
    }

    /// Quita el callback; devuelve si había uno
    pub fn unregister(&mut self, symbol: GestureSymbol) -> bool {
        self.slots[symbol.index()].take().is_some()
    }

    pub fn lookup(&mut self, symbol: GestureSymbol) -> Option<&mut GestureCallback> {
        self.slots[symbol.index()].as_mut()
    }

    pub fn is_registered(&self, symbol: GestureSymbol) -> bool {
        self.slots[symbol.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gestos con callback, en orden de declaración
    pub fn registered(&self) -> impl Iterator<Item = GestureSymbol> + '_ {
        GestureSymbol::ALL
            .iter()
            .copied()
            .filter(move |g| self.is_registered(*g))
    }
}

impl Default for GestureRegistry {
    fn default() -> Self {
        Self::new()
    }
}
