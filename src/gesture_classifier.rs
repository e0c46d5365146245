use serde::Deserialize;
use thiserror::Error;

use crate::types::{
    DetectedHand, GestureSymbol, HandId, HandLandmarkSet, Landmark, FINGER_TIP_PIP,
    NUM_LANDMARKS, THUMB_IP, THUMB_TIP,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Landmarks inválidos para {hand}: se esperaban {expected}, llegaron {actual}")]
    InvalidInput {
        hand: HandId,
        expected: usize,
        actual: usize,
    },
}

/// Regla fija para decidir si el pulgar está extendido.
/// No se adapta a la orientación de la mano.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbRule {
    /// Imagen espejada (cámara frontal volteada): extendido si tip.x < ip.x
    #[default]
    Mirrored,
    /// Imagen sin voltear: extendido si tip.x > ip.x
    Unmirrored,
}

impl TryFrom<&DetectedHand> for HandLandmarkSet {
    type Error = ClassifierError;

    fn try_from(hand: &DetectedHand) -> Result<Self, Self::Error> {
        let landmarks: [Landmark; NUM_LANDMARKS] =
            hand.landmarks
                .as_slice()
                .try_into()
                .map_err(|_| ClassifierError::InvalidInput {
                    hand: hand.id,
                    expected: NUM_LANDMARKS,
                    actual: hand.landmarks.len(),
                })?;
        Ok(HandLandmarkSet::new(hand.id, landmarks))
    }
}

/// Clasificador de postura por conteo de dedos extendidos
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureClassifier {
    thumb_rule: ThumbRule,
}

impl GestureClassifier {
    pub fn new(thumb_rule: ThumbRule) -> Self {
        Self { thumb_rule }
    }

    pub fn thumb_rule(&self) -> ThumbRule {
        self.thumb_rule
    }

    /// Flags de extensión en orden pulgar, índice, medio, anular, meñique
    pub fn extended_fingers(&self, hand: &HandLandmarkSet) -> [bool; 5] {
        let tip = hand.landmarks[THUMB_TIP];
        let ip = hand.landmarks[THUMB_IP];
        let thumb = match self.thumb_rule {
            ThumbRule::Mirrored => tip.x < ip.x,
            ThumbRule::Unmirrored => tip.x > ip.x,
        };

        let mut flags = [thumb, false, false, false, false];
        for (i, (tip_idx, pip_idx)) in FINGER_TIP_PIP.iter().enumerate() {
            // y crece hacia abajo en la imagen
            flags[i + 1] = hand.landmarks[*tip_idx].y < hand.landmarks[*pip_idx].y;
        }
        flags
    }

    /// Gesto de postura de una mano; None si el conteo no tiene símbolo (1 dedo)
    pub fn classify(&self, hand: &HandLandmarkSet) -> Option<GestureSymbol> {
        let count = self
            .extended_fingers(hand)
            .iter()
            .filter(|extended| **extended)
            .count();
        symbol_for_count(count)
    }

    /// Igual que `classify` pero acepta landmarks sin validar
    pub fn classify_landmarks(
        &self,
        hand: &DetectedHand,
    ) -> Result<Option<GestureSymbol>, ClassifierError> {
        let hand = HandLandmarkSet::try_from(hand)?;
        Ok(self.classify(&hand))
    }
}

fn symbol_for_count(count: usize) -> Option<GestureSymbol> {
    match count {
        0 => Some(GestureSymbol::Fist),
        2 => Some(GestureSymbol::TwoFingers),
        3 => Some(GestureSymbol::ThreeFingers),
        4 => Some(GestureSymbol::FourFingers),
        5 => Some(GestureSymbol::OpenPalm),
        _ => None,
    }
}
