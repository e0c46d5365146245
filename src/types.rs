use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Punto normalizado de la mano: x, y en [0,1] relativos al frame, z libre
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Identidad estable de una mano entre frames (la entrega la fuente)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandId(pub u32);

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mano#{}", self.0)
    }
}

/// Mano tal como llega del estimador externo, sin validar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedHand {
    pub id: HandId,
    pub landmarks: Vec<Landmark>,
}

/// Las 21 posiciones de una mano ya validadas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarkSet {
    pub id: HandId,
    pub landmarks: [Landmark; NUM_LANDMARKS],
}

impl HandLandmarkSet {
    pub fn new(id: HandId, landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { id, landmarks }
    }

    /// `None` fuera de 0..21
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    /// Posición 2D de la muñeca, punto de referencia para los swipes
    pub fn wrist(&self) -> (f64, f64) {
        let w = self.landmarks[WRIST];
        (w.x, w.y)
    }
}

/// Todas las manos detectadas en un frame de cámara
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkFrame {
    pub index: u64,
    pub hands: Vec<DetectedHand>,
}

/// Conjunto cerrado de gestos reconocibles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureSymbol {
    Fist,
    OpenPalm,
    TwoFingers,
    ThreeFingers,
    FourFingers,
    LeftSwipe,
    RightSwipe,
}

impl GestureSymbol {
    pub const COUNT: usize = 7;

    /// En orden de declaración; también es el orden de despacho
    pub const ALL: [GestureSymbol; Self::COUNT] = [
        GestureSymbol::Fist,
        GestureSymbol::OpenPalm,
        GestureSymbol::TwoFingers,
        GestureSymbol::ThreeFingers,
        GestureSymbol::FourFingers,
        GestureSymbol::LeftSwipe,
        GestureSymbol::RightSwipe,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Nombre externo usado al registrar callbacks y en la configuración
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fist => "fist",
            Self::OpenPalm => "open_palm",
            Self::TwoFingers => "two_fingers",
            Self::ThreeFingers => "three_fingers",
            Self::FourFingers => "four_fingers",
            Self::LeftSwipe => "left_swipe",
            Self::RightSwipe => "right_swipe",
        }
    }

    /// Etiqueta para mostrar en pantalla
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Fist => "Fist",
            Self::OpenPalm => "Open Palm",
            Self::TwoFingers => "Two Fingers",
            Self::ThreeFingers => "Three Fingers",
            Self::FourFingers => "Four Fingers",
            Self::LeftSwipe => "Left Swipe",
            Self::RightSwipe => "Right Swipe",
        }
    }

    pub fn is_swipe(self) -> bool {
        matches!(self, Self::LeftSwipe | Self::RightSwipe)
    }
}

impl fmt::Display for GestureSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Gesto desconocido: {0:?}")]
pub struct UnknownGesture(pub String);

impl FromStr for GestureSymbol {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGesture(s.to_string()))
    }
}

/// Conjunto de gestos indexado por ordinal (un bit por gesto)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GestureSet {
    bits: u8,
}

impl GestureSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn insert(&mut self, symbol: GestureSymbol) {
        self.bits |= 1 << symbol.index();
    }

    pub fn remove(&mut self, symbol: GestureSymbol) {
        self.bits &= !(1 << symbol.index());
    }

    pub fn contains(&self, symbol: GestureSymbol) -> bool {
        self.bits & (1 << symbol.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Elementos de `self` que no están en `other`
    pub fn difference(&self, other: &GestureSet) -> GestureSet {
        GestureSet {
            bits: self.bits & !other.bits,
        }
    }

    pub fn union(&self, other: &GestureSet) -> GestureSet {
        GestureSet {
            bits: self.bits | other.bits,
        }
    }

    /// Itera en orden de declaración del enum
    pub fn iter(&self) -> impl Iterator<Item = GestureSymbol> + '_ {
        GestureSymbol::ALL
            .iter()
            .copied()
            .filter(move |g| self.contains(*g))
    }
}

impl FromIterator<GestureSymbol> for GestureSet {
    fn from_iter<I: IntoIterator<Item = GestureSymbol>>(iter: I) -> Self {
        let mut set = GestureSet::empty();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl<const N: usize> From<[GestureSymbol; N]> for GestureSet {
    fn from(symbols: [GestureSymbol; N]) -> Self {
        symbols.into_iter().collect()
    }
}

impl fmt::Debug for GestureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|g| g.as_str())).finish()
    }
}

/// Cambio de estado de un gesto entre dos frames consecutivos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Appear,
    Disappear,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Appear => "appear",
            Self::Disappear => "disappear",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datos del frame que provocó la transición
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameContext {
    pub index: u64,
    pub hands: usize,
}

/// Único payload que reciben los callbacks registrados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEvent {
    pub symbol: GestureSymbol,
    pub transition: Transition,
    pub frame: Option<FrameContext>,
}

/// Constantes del sistema
pub const NUM_LANDMARKS: usize = 21;

// Índices anatómicos (esquema de 21 puntos de MediaPipe)
pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Pares (punta, articulación media) de los cuatro dedos largos
pub const FINGER_TIP_PIP: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

pub const SWIPE_THRESHOLD: f64 = 0.1; // unidades normalizadas [0,1]
pub const MOTION_HISTORY_LEN: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_names_round_trip() {
        for symbol in GestureSymbol::ALL {
            assert_eq!(symbol.as_str().parse::<GestureSymbol>(), Ok(symbol));
        }
        assert!("thumbs_up".parse::<GestureSymbol>().is_err());
    }

    #[test]
    fn test_set_difference_and_order() {
        let current = GestureSet::from([GestureSymbol::RightSwipe, GestureSymbol::Fist]);
        let previous = GestureSet::from([GestureSymbol::Fist, GestureSymbol::OpenPalm]);

        let appeared: Vec<_> = current.difference(&previous).iter().collect();
        let disappeared: Vec<_> = previous.difference(&current).iter().collect();

        assert_eq!(appeared, vec![GestureSymbol::RightSwipe]);
        assert_eq!(disappeared, vec![GestureSymbol::OpenPalm]);
        assert_eq!(
            current.iter().collect::<Vec<_>>(),
            vec![GestureSymbol::Fist, GestureSymbol::RightSwipe]
        );
    }

    #[test]
    fn test_landmark_lookup_is_bounded() {
        let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
        landmarks[WRIST] = Landmark::new(0.3, 0.7, 0.0);
        let hand = HandLandmarkSet::new(HandId(0), landmarks);

        assert_eq!(hand.get(WRIST), Some(Landmark::new(0.3, 0.7, 0.0)));
        assert_eq!(hand.get(PINKY_TIP), Some(Landmark::default()));
        assert_eq!(hand.get(NUM_LANDMARKS), None);
        assert_eq!(hand.wrist(), (0.3, 0.7));
    }

    #[test]
    fn test_set_insert_remove() {
        let mut set = GestureSet::empty();
        assert!(set.is_empty());
        set.insert(GestureSymbol::TwoFingers);
        set.insert(GestureSymbol::TwoFingers);
        assert_eq!(set.len(), 1);
        set.remove(GestureSymbol::TwoFingers);
        assert!(set.is_empty());
    }
}
