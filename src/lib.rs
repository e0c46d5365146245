//! Motor de estados de gestos de mano.
//!
//! Cada frame trae los 21 landmarks de cada mano detectada. Se clasifica la
//! postura (conteo de dedos), se siguen los swipes de la muñeca y el motor
//! compara el conjunto de gestos del frame con el del frame anterior para
//! disparar callbacks de aparición y desaparición.

pub mod bindings;
pub mod config;
pub mod daemon;
pub mod frame_driver;
pub mod gesture_classifier;
pub mod gesture_engine;
pub mod gesture_registry;
pub mod hid;
pub mod landmark_source;
pub mod motion_tracker;
pub mod types;

pub use frame_driver::{FrameDriver, FrameReport, RunSummary};
pub use gesture_classifier::{ClassifierError, GestureClassifier, ThumbRule};
pub use gesture_engine::{GestureEngine, Transitions};
pub use gesture_registry::{GestureRegistry, RegistryError};
pub use motion_tracker::{AppendPolicy, MotionTracker, TrackerParams};
pub use types::{
    DetectedHand, FrameContext, GestureEvent, GestureSet, GestureSymbol, HandId, Landmark,
    LandmarkFrame, Transition,
};
