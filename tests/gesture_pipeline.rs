use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;

use proptest::prelude::*;

use manos::config::DaemonConfig;
use manos::hid::{HidCommand, KeyName};
use manos::landmark_source::ReplaySource;
use manos::types::NUM_LANDMARKS;
use manos::{
    FrameDriver, GestureEngine, GestureEvent, GestureSet, GestureSymbol, Transition,
};

type Log = Rc<RefCell<Vec<GestureEvent>>>;

fn engine_with_log() -> (GestureEngine, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut engine = GestureEngine::new();
    for symbol in GestureSymbol::ALL {
        let log = Rc::clone(&log);
        engine.register(symbol, move |ev| log.borrow_mut().push(*ev));
    }
    (engine, log)
}

/// Filas CSV de una mano: `extended` = dedos extendidos (pulgar primero)
fn hand_rows(frame: u64, hand: u32, extended: [bool; 5], wrist_x: f64) -> String {
    let mut points = vec![(0.5f64, 0.5f64); NUM_LANDMARKS];
    points[0] = (wrist_x, 0.9);
    points[3] = (0.40, 0.5);
    points[4] = (if extended[0] { 0.30 } else { 0.45 }, 0.5);
    for (i, (tip, pip)) in [(8, 6), (12, 10), (16, 14), (20, 18)].into_iter().enumerate() {
        points[pip] = (0.5, 0.5);
        points[tip] = (0.5, if extended[i + 1] { 0.3 } else { 0.6 });
    }
    points
        .iter()
        .enumerate()
        .map(|(lm, (x, y))| format!("{frame},{hand},{lm},{x},{y},0.0\n"))
        .collect()
}

fn arb_set() -> impl Strategy<Value = GestureSet> {
    prop::collection::vec(prop::sample::select(GestureSymbol::ALL.to_vec()), 0..4)
        .prop_map(|symbols| symbols.into_iter().collect())
}

proptest! {
    #[test]
    fn appear_and_disappear_counts_stay_balanced(frames in prop::collection::vec(arb_set(), 0..40)) {
        let (mut engine, log) = engine_with_log();
        for set in &frames {
            engine.update(*set, None);
        }

        for symbol in GestureSymbol::ALL {
            let count = |t: Transition| {
                log.borrow().iter().filter(|e| e.symbol == symbol && e.transition == t).count()
            };
            let appears = count(Transition::Appear);
            let disappears = count(Transition::Disappear);
            let active = engine.active().contains(symbol);
            prop_assert_eq!(appears, disappears + usize::from(active));
        }
    }

    #[test]
    fn repeating_a_frame_dispatches_nothing(set in arb_set(), before in arb_set()) {
        let (mut engine, log) = engine_with_log();
        engine.update(before, None);
        engine.update(set, None);
        let calls = log.borrow().len();

        let again = engine.update(set, None);
        prop_assert!(again.is_empty());
        prop_assert_eq!(log.borrow().len(), calls);
        prop_assert_eq!(engine.active(), set);
    }
}

#[test]
fn round_trip_appear_then_disappear() {
    let (mut engine, log) = engine_with_log();
    engine.update(GestureSet::from([GestureSymbol::OpenPalm]), None);
    engine.update(GestureSet::empty(), None);

    let seen: Vec<_> = log.borrow().iter().map(|e| (e.symbol, e.transition)).collect();
    assert_eq!(
        seen,
        vec![
            (GestureSymbol::OpenPalm, Transition::Appear),
            (GestureSymbol::OpenPalm, Transition::Disappear),
        ]
    );
}

#[test]
fn csv_recording_end_to_end() {
    const FIST: [bool; 5] = [false; 5];
    const PALM: [bool; 5] = [true; 5];

    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "frame,hand,landmark,x,y,z").unwrap();
    write!(file, "{}", hand_rows(0, 0, FIST, 0.50)).unwrap();
    write!(file, "{}", hand_rows(1, 0, FIST, 0.50)).unwrap();
    write!(file, "{}", hand_rows(2, 0, PALM, 0.20)).unwrap();
    // el frame 3 falta: sin manos
    write!(file, "{}", hand_rows(4, 0, PALM, 0.20)).unwrap();
    file.flush().unwrap();

    let config = DaemonConfig::default();
    let bindings = Rc::new(RefCell::new(config.action_bindings().unwrap()));
    let commands = Rc::new(RefCell::new(Vec::new()));

    let mut engine = GestureEngine::new();
    for symbol in GestureSymbol::ALL {
        let bindings = Rc::clone(&bindings);
        let commands = Rc::clone(&commands);
        engine.register(symbol, move |ev| {
            if let Some(cmd) = bindings.borrow_mut().handle(ev) {
                commands.borrow_mut().push(cmd);
            }
        });
    }

    let mut source = ReplaySource::from_csv(file.path()).unwrap();
    let mut driver = FrameDriver::new(config.classifier(), config.tracker(), engine);
    let mut reports = Vec::new();
    let summary = driver
        .run(&mut source, &AtomicBool::new(false), |r| reports.push(*r))
        .unwrap();

    assert_eq!(summary.frames_processed, 5);
    assert_eq!(
        reports[2].symbols,
        GestureSet::from([GestureSymbol::OpenPalm, GestureSymbol::LeftSwipe])
    );
    assert!(reports[3].symbols.is_empty());
    assert_eq!(
        *commands.borrow(),
        vec![
            HidCommand::Press(KeyName::Down),
            HidCommand::Press(KeyName::Up),
            HidCommand::Press(KeyName::Left),
            HidCommand::Release(KeyName::Down),
            HidCommand::Release(KeyName::Up),
            HidCommand::Release(KeyName::Left),
            HidCommand::Press(KeyName::Up),
        ]
    );
    assert_eq!(driver.engine().active(), GestureSet::from([GestureSymbol::OpenPalm]));
}

#[test]
fn config_file_drives_tracker() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[tracker]\nswipe_threshold = 0.5\n\n[bindings]\nopen_palm = \"space\"\n"
    )
    .unwrap();

    let config = DaemonConfig::load(file.path()).unwrap();
    let mut tracker = config.tracker();
    let hand = manos::HandId(3);
    assert_eq!(tracker.track(hand, (0.2, 0.5)), None);
    assert_eq!(tracker.track(hand, (0.6, 0.5)), None);
    assert_eq!(tracker.track(hand, (0.05, 0.5)), Some(GestureSymbol::LeftSwipe));

    let bindings = config.action_bindings().unwrap();
    assert_eq!(bindings.bound().count(), 1);
}
