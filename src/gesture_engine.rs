use tracing::{debug, trace};

use crate::gesture_registry::{GestureRegistry, RegistryError};
use crate::types::{FrameContext, GestureEvent, GestureSet, GestureSymbol, Transition};

/// Resultado de un `update`: qué gestos entraron y cuáles salieron
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transitions {
    pub appeared: GestureSet,
    pub disappeared: GestureSet,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty()
    }
}

/// Contadores de callbacks efectivamente ejecutados
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub appears: u64,
    pub disappears: u64,
}

/// Máquina de estados de gestos.
///
/// Cada símbolo está INACTIVO o ACTIVO. Un símbolo presente en el frame
/// actual y ausente del conjunto activo dispara `Appear`; uno activo que ya no
/// está en el frame dispara `Disappear`. Los gestos que se mantienen no
/// generan eventos. El conjunto activo se reemplaza entero en cada frame.
pub struct GestureEngine {
    registry: GestureRegistry,
    active: GestureSet,
    stats: DispatchStats,
}

impl GestureEngine {
    pub fn new() -> Self {
        Self::with_registry(GestureRegistry::new())
    }

    pub fn with_registry(registry: GestureRegistry) -> Self {
        Self {
            registry,
            active: GestureSet::empty(),
            stats: DispatchStats::default(),
        }
    }

    pub fn register<F>(&mut self, symbol: GestureSymbol, callback: F)
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        self.registry.register(symbol, callback);
    }

    pub fn register_gesture<F>(&mut self, name: &str, callback: F) -> Result<(), RegistryError>
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        self.registry.register_gesture(name, callback)
    }

    pub fn unregister(&mut self, symbol: GestureSymbol) -> bool {
        self.registry.unregister(symbol)
    }

    pub fn registry(&self) -> &GestureRegistry {
        &self.registry
    }

    /// Gestos activos tras el último frame procesado
    pub fn active(&self) -> GestureSet {
        self.active
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Procesa el conjunto de gestos de un frame. Llamar exactamente una vez por frame.
    pub fn update(&mut self, current: GestureSet, frame: Option<FrameContext>) -> Transitions {
        let transitions = Transitions {
            appeared: current.difference(&self.active),
            disappeared: self.active.difference(&current),
        };

        for symbol in transitions.appeared.iter() {
            self.dispatch(symbol, Transition::Appear, frame);
        }
        for symbol in transitions.disappeared.iter() {
            self.dispatch(symbol, Transition::Disappear, frame);
        }

        if !transitions.is_empty() {
            debug!(
                appeared = ?transitions.appeared,
                disappeared = ?transitions.disappeared,
                active = ?current,
                "transición de gestos"
            );
        }

        self.active = current;
        transitions
    }

    /// Vacía el conjunto activo sin notificar a nadie
    pub fn reset(&mut self) {
        self.active = GestureSet::empty();
    }

    fn dispatch(&mut self, symbol: GestureSymbol, transition: Transition, frame: Option<FrameContext>) {
        let Some(callback) = self.registry.lookup(symbol) else {
            // Gesto sin registrar: se ignora en silencio
            trace!(%symbol, %transition, "sin callback");
            return;
        };

        callback(&GestureEvent {
            symbol,
            transition,
            frame,
        });

        match transition {
            Transition::Appear => self.stats.appears += 1,
            Transition::Disappear => self.stats.disappears += 1,
        }
    }
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new()
    }
}
