use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::bindings::ActionBindings;
use crate::gesture_classifier::{GestureClassifier, ThumbRule};
use crate::hid::{GestureAction, UnknownAction};
use crate::motion_tracker::{MotionTracker, TrackerParams};
use crate::types::{GestureSymbol, UnknownGesture};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML inválido: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    UnknownGesture(#[from] UnknownGesture),

    #[error("Binding de {gesture}: {source}")]
    UnknownAction {
        gesture: GestureSymbol,
        #[source]
        source: UnknownAction,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub thumb_rule: ThumbRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub enabled: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuración del daemon, leída de un TOML:
///
/// ```toml
/// [classifier]
/// thumb_rule = "mirrored"
///
/// [tracker]
/// swipe_threshold = 0.1
/// history_capacity = 5
/// append_policy = "always"
///
/// [bindings]
/// fist = "down"
/// four_fingers = "click:left"
///
/// [labels]
/// enabled = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub classifier: ClassifierConfig,
    pub tracker: TrackerParams,
    /// Nombre de gesto -> acción. Si falta la sección se usan las flechas.
    pub bindings: BTreeMap<String, String>,
    pub labels: LabelConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let bindings = ActionBindings::arrows()
            .bound()
            .map(|(symbol, action)| (symbol.as_str().to_string(), action.to_string()))
            .collect();
        Self {
            classifier: ClassifierConfig::default(),
            tracker: TrackerParams::default(),
            bindings,
            labels: LabelConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "configuración cargada");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn classifier(&self) -> GestureClassifier {
        GestureClassifier::new(self.classifier.thumb_rule)
    }

    pub fn tracker(&self) -> MotionTracker {
        MotionTracker::new(self.tracker)
    }

    /// Valida nombres de gestos y acciones de la sección `[bindings]`
    pub fn action_bindings(&self) -> Result<ActionBindings, ConfigError> {
        let mut bindings = ActionBindings::new();
        for (name, action) in &self.bindings {
            let gesture: GestureSymbol = name.parse()?;
            let action: GestureAction = action
                .parse()
                .map_err(|source| ConfigError::UnknownAction { gesture, source })?;
            bindings.bind(gesture, action);
        }
        Ok(bindings)
    }
}
