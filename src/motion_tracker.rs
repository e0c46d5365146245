use std::collections::{HashMap, VecDeque};

use serde::Deserialize;
use tracing::trace;

use crate::types::{GestureSymbol, HandId, MOTION_HISTORY_LEN, SWIPE_THRESHOLD};

/// Qué hacer con la posición actual cuando se detecta un swipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendPolicy {
    /// Siempre se guarda la posición (seguimiento continuo)
    #[default]
    Always,
    /// Solo se guarda si no hubo swipe: el siguiente frame vuelve a compararse
    /// contra la misma posición previa
    WhenIdle,
}

/// Parámetros del tracker de movimiento
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Desplazamiento horizontal mínimo entre frames (estricto) (default: 0.1)
    pub swipe_threshold: f64,
    /// Posiciones retenidas por mano (default: 5)
    pub history_capacity: usize,
    pub append_policy: AppendPolicy,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            swipe_threshold: SWIPE_THRESHOLD,
            history_capacity: MOTION_HISTORY_LEN,
            append_policy: AppendPolicy::Always,
        }
    }
}

/// Buffer circular de posiciones de la muñeca de una mano
#[derive(Debug, Clone)]
pub struct MotionHistory {
    buffer: VecDeque<(f64, f64)>,
    capacity: usize,
}

impl MotionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Añade una posición descartando las más antiguas
    pub fn push(&mut self, position: (f64, f64)) {
        self.buffer.push_back(position);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.buffer.back().copied()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Posiciones de la más antigua a la más reciente
    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.buffer.iter().copied()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Detecta swipes horizontales comparando la muñeca contra el frame anterior
pub struct MotionTracker {
    params: TrackerParams,
    histories: HashMap<HandId, MotionHistory>,
}

impl MotionTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            histories: HashMap::new(),
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Llamar una vez por mano y por frame
    pub fn track(&mut self, hand: HandId, position: (f64, f64)) -> Option<GestureSymbol> {
        let TrackerParams {
            swipe_threshold,
            history_capacity,
            append_policy,
        } = self.params;
        let history = self
            .histories
            .entry(hand)
            .or_insert_with(|| MotionHistory::new(history_capacity));

        let swipe = history.last().and_then(|prev| {
            let dx = position.0 - prev.0;
            if dx > swipe_threshold {
                Some(GestureSymbol::RightSwipe)
            } else if dx < -swipe_threshold {
                Some(GestureSymbol::LeftSwipe)
            } else {
                None
            }
        });

        let append = match append_policy {
            AppendPolicy::Always => true,
            AppendPolicy::WhenIdle => swipe.is_none(),
        };
        if append {
            history.push(position);
        }

        if let Some(symbol) = swipe {
            trace!(%hand, ?position, %symbol, "swipe detectado");
        }
        swipe
    }

    pub fn history(&self, hand: HandId) -> Option<&MotionHistory> {
        self.histories.get(&hand)
    }

    /// Olvida el historial de una mano (la siguiente observación no emite swipe)
    pub fn forget(&mut self, hand: HandId) {
        self.histories.remove(&hand);
    }

    pub fn tracked_hands(&self) -> usize {
        self.histories.len()
    }

    pub fn reset(&mut self) {
        self.histories.clear();
    }
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}
