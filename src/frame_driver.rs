use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, trace, warn};

use crate::gesture_classifier::{ClassifierError, GestureClassifier};
use crate::gesture_engine::{GestureEngine, Transitions};
use crate::landmark_source::{LandmarkSource, SourceError};
use crate::motion_tracker::MotionTracker;
use crate::types::{FrameContext, GestureSet, HandLandmarkSet, LandmarkFrame};

/// Lo que pasó en un frame procesado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub index: u64,
    pub hands: usize,
    pub symbols: GestureSet,
    pub transitions: Transitions,
}

/// Estadísticas de una ejecución de `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub cancelled: bool,
}

/// Une clasificador, tracker y motor: un frame entra, un update sale
pub struct FrameDriver {
    classifier: GestureClassifier,
    tracker: MotionTracker,
    engine: GestureEngine,
}

impl FrameDriver {
    pub fn new(classifier: GestureClassifier, tracker: MotionTracker, engine: GestureEngine) -> Self {
        Self {
            classifier,
            tracker,
            engine,
        }
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GestureEngine {
        &mut self.engine
    }

    pub fn tracker(&self) -> &MotionTracker {
        &self.tracker
    }

    /// Procesa un frame completo. Si alguna mano trae landmarks inválidos el
    /// frame entero se descarta: no se clasifica, no se mueve el historial y el
    /// motor no se actualiza.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Result<FrameReport, ClassifierError> {
        let hands = frame
            .hands
            .iter()
            .map(HandLandmarkSet::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut symbols = GestureSet::empty();
        for hand in &hands {
            if let Some(posture) = self.classifier.classify(hand) {
                symbols.insert(posture);
            }
            if let Some(swipe) = self.tracker.track(hand.id, hand.wrist()) {
                symbols.insert(swipe);
            }
        }
        trace!(frame = frame.index, hands = hands.len(), ?symbols, "frame clasificado");

        let context = FrameContext {
            index: frame.index,
            hands: hands.len(),
        };
        let transitions = self.engine.update(symbols, Some(context));

        Ok(FrameReport {
            index: frame.index,
            hands: hands.len(),
            symbols,
            transitions,
        })
    }

    /// Bucle principal: consume la fuente hasta agotarla o hasta que `cancel` se active
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        cancel: &AtomicBool,
        mut on_frame: F,
    ) -> Result<RunSummary, SourceError>
    where
        S: LandmarkSource + ?Sized,
        F: FnMut(&FrameReport),
    {
        let mut summary = RunSummary::default();

        loop {
            if cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };

            match self.process_frame(&frame) {
                Ok(report) => {
                    summary.frames_processed += 1;
                    on_frame(&report);
                }
                Err(e) => {
                    summary.frames_skipped += 1;
                    warn!(frame = frame.index, "frame descartado: {}", e);
                }
            }
        }

        info!(
            processed = summary.frames_processed,
            skipped = summary.frames_skipped,
            cancelled = summary.cancelled,
            "fin del bucle de frames"
        );
        Ok(summary)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(
            GestureClassifier::default(),
            MotionTracker::default(),
            GestureEngine::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture_classifier::tests::hand_with;
    use crate::landmark_source::ReplaySource;
    use crate::types::{DetectedHand, GestureSymbol, HandId, Transition};
    use std::cell::RefCell;
    use std::rc::Rc;

    const FIST: [bool; 5] = [false; 5];
    const PALM: [bool; 5] = [true; 5];

    fn frame(index: u64, hands: Vec<DetectedHand>) -> LandmarkFrame {
        LandmarkFrame { index, hands }
    }

    fn hand(id: u32, extended: [bool; 5], wrist_x: f64) -> DetectedHand {
        DetectedHand {
            id: HandId(id),
            ..hand_with(extended, wrist_x)
        }
    }

    #[test]
    fn test_posture_and_swipe_union() {
        let mut driver = FrameDriver::default();

        let r0 = driver.process_frame(&frame(0, vec![hand(0, FIST, 0.2)])).unwrap();
        assert_eq!(r0.symbols, GestureSet::from([GestureSymbol::Fist]));

        let r1 = driver.process_frame(&frame(1, vec![hand(0, FIST, 0.5)])).unwrap();
        assert_eq!(
            r1.symbols,
            GestureSet::from([GestureSymbol::Fist, GestureSymbol::RightSwipe])
        );
        assert_eq!(r1.transitions.appeared, GestureSet::from([GestureSymbol::RightSwipe]));
    }

    #[test]
    fn test_wrist_step_of_a_tenth_keeps_posture_only() {
        let mut driver = FrameDriver::default();
        driver.process_frame(&frame(0, vec![hand(0, FIST, 0.5)])).unwrap();
        let report = driver.process_frame(&frame(1, vec![hand(0, FIST, 0.6)])).unwrap();
        assert_eq!(report.symbols, GestureSet::from([GestureSymbol::Fist]));
        assert!(report.transitions.is_empty());
    }

    #[test]
    fn test_two_hands_contribute_symbols() {
        let mut driver = FrameDriver::default();
        let report = driver
            .process_frame(&frame(0, vec![hand(0, FIST, 0.2), hand(1, PALM, 0.8)]))
            .unwrap();
        assert_eq!(
            report.symbols,
            GestureSet::from([GestureSymbol::Fist, GestureSymbol::OpenPalm])
        );
        assert_eq!(report.hands, 2);
    }

    #[test]
    fn test_invalid_hand_skips_whole_frame() {
        let mut driver = FrameDriver::default();
        driver.process_frame(&frame(0, vec![hand(0, FIST, 0.2)])).unwrap();

        let mut broken = hand(1, PALM, 0.9);
        broken.landmarks.truncate(5);
        let err = driver
            .process_frame(&frame(1, vec![hand(0, PALM, 0.9), broken]))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput { actual: 5, .. }));

        // Ni el motor ni el historial se movieron
        assert_eq!(driver.engine().active(), GestureSet::from([GestureSymbol::Fist]));
        assert_eq!(driver.tracker().history(HandId(0)).unwrap().len(), 1);
    }

    #[test]
    fn test_run_drives_callbacks_until_exhausted() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut driver = FrameDriver::default();
        let sink = Rc::clone(&log);
        driver
            .engine_mut()
            .register(GestureSymbol::Fist, move |ev| sink.borrow_mut().push(ev.transition));

        let mut broken = hand(0, FIST, 0.2);
        broken.landmarks.clear();
        let mut source = ReplaySource::new(vec![
            frame(0, vec![hand(0, FIST, 0.2)]),
            frame(1, vec![broken]),
            frame(2, vec![hand(0, FIST, 0.2)]),
            frame(3, vec![]),
        ]);

        let mut seen = Vec::new();
        let summary = driver
            .run(&mut source, &AtomicBool::new(false), |r| seen.push(r.index))
            .unwrap();

        assert_eq!(seen, vec![0, 2, 3]);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_skipped, 1);
        assert!(!summary.cancelled);
        assert_eq!(*log.borrow(), vec![Transition::Appear, Transition::Disappear]);
    }

    #[test]
    fn test_run_stops_when_cancelled() {
        let mut driver = FrameDriver::default();
        let mut source = ReplaySource::new(vec![frame(0, vec![]), frame(1, vec![])]);
        let summary = driver
            .run(&mut source, &AtomicBool::new(true), |_| {})
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(source.remaining(), 2);
    }
}
