use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use csv::ReaderBuilder;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{DetectedHand, HandId, Landmark, LandmarkFrame, NUM_LANDMARKS};

/// Máximo de frames vacíos que se rellenan entre dos frames de una grabación
pub const MAX_FRAME_GAP: u64 = 10_000;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Línea {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Fuente de frames de landmarks (el estimador externo o una grabación)
pub trait LandmarkSource {
    /// `Ok(None)` cuando la fuente se agota
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        (**self).next_frame()
    }
}

// ── CSV ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LandmarkRow {
    frame: u64,
    hand: u32,
    landmark: usize,
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

/// Carga una grabación CSV con formato frame,hand,landmark,x,y,z.
/// Los números de frame que falten se rellenan con frames sin manos.
pub fn load_frames_from_csv(path: impl AsRef<Path>) -> Result<Vec<LandmarkFrame>, SourceError> {
    let path = path.as_ref();
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let frames = parse_csv(reader)?;
    info!(path = %path.display(), frames = frames.len(), "grabación CSV cargada");
    Ok(frames)
}

fn parse_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<LandmarkFrame>, SourceError> {
    // frame -> mano -> landmark
    let mut samples: BTreeMap<u64, BTreeMap<u32, BTreeMap<usize, Landmark>>> = BTreeMap::new();
    // frame -> primera línea donde aparece
    let mut first_line: BTreeMap<u64, usize> = BTreeMap::new();

    for (row_idx, result) in reader.deserialize::<LandmarkRow>().enumerate() {
        let row = result?;
        let line = row_idx + 2;
        if row.landmark >= NUM_LANDMARKS {
            return Err(SourceError::Malformed {
                line,
                reason: format!("landmark {} fuera de rango", row.landmark),
            });
        }
        first_line.entry(row.frame).or_insert(line);
        samples
            .entry(row.frame)
            .or_default()
            .entry(row.hand)
            .or_default()
            .insert(row.landmark, Landmark::new(row.x, row.y, row.z));
    }

    let (Some(&first), Some(&last)) = (samples.keys().next(), samples.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let mut previous = first;
    for (&frame, &line) in &first_line {
        let gap = frame - previous;
        if gap > MAX_FRAME_GAP {
            return Err(SourceError::Malformed {
                line,
                reason: format!("salto de {gap} frames tras el frame {previous}"),
            });
        }
        previous = frame;
    }

    let frames = (first..=last)
        .map(|index| {
            let hands = samples
                .remove(&index)
                .unwrap_or_default()
                .into_iter()
                .map(|(hand, points)| DetectedHand {
                    id: HandId(hand),
                    // Los índices que falten dejan la mano incompleta y el driver la rechaza
                    landmarks: contiguous_prefix(points),
                })
                .collect();
            LandmarkFrame { index, hands }
        })
        .collect();

    Ok(frames)
}

fn contiguous_prefix(points: BTreeMap<usize, Landmark>) -> Vec<Landmark> {
    points
        .into_iter()
        .enumerate()
        .take_while(|(expected, (idx, _))| expected == idx)
        .map(|(_, (_, lm))| lm)
        .collect()
}

/// Reproduce frames ya cargados en memoria
pub struct ReplaySource {
    frames: VecDeque<LandmarkFrame>,
}

impl ReplaySource {
    pub fn new(frames: Vec<LandmarkFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Ok(Self::new(load_frames_from_csv(path)?))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

// ── JSON lines ─────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    handedness: Option<String>,
    #[serde(default)]
    score: Option<f32>,
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize, Debug)]
struct DetectionResult {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Lee un frame JSON por línea:
/// `{"hands":[{"id":0,"handedness":"Left","score":0.9,"landmarks":[{"x":..,"y":..,"z":..}]}]}`
///
/// Las líneas que no se pueden decodificar se descartan con un warning.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    next_index: u64,
    skipped_lines: usize,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            next_index: 0,
            skipped_lines: 0,
            buf: String::new(),
        }
    }

    /// Líneas descartadas (JSON inválido, error del estimador o ids repetidos)
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

/// Las manos con `id` lo conservan; las demás toman, en orden, los ids libres
/// más bajos del frame. `None` si dos manos declaran el mismo id.
fn assign_hand_ids(hands: &[HandJson]) -> Option<Vec<HandId>> {
    let mut taken = HashSet::new();
    for id in hands.iter().filter_map(|h| h.id) {
        if !taken.insert(id) {
            return None;
        }
    }

    let mut next_free = 0u32;
    let ids = hands
        .iter()
        .map(|hand| {
            let id = hand.id.unwrap_or_else(|| {
                while taken.contains(&next_free) {
                    next_free += 1;
                }
                taken.insert(next_free);
                next_free
            });
            HandId(id)
        })
        .collect();
    Some(ids)
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let result: DetectionResult = match serde_json::from_str(text) {
                Ok(result) => result,
                Err(e) => {
                    self.skipped_lines += 1;
                    warn!(line = self.line, "JSON inválido, línea descartada: {}", e);
                    continue;
                }
            };

            if let Some(error) = result.error {
                self.skipped_lines += 1;
                warn!(line = self.line, %error, "el estimador reportó un error, frame descartado");
                continue;
            }

            let Some(ids) = assign_hand_ids(&result.hands) else {
                self.skipped_lines += 1;
                warn!(line = self.line, "ids de mano repetidos, frame descartado");
                continue;
            };

            let index = self.next_index;
            self.next_index += 1;

            let hands = result
                .hands
                .into_iter()
                .zip(ids)
                .map(|(hand, id)| {
                    if let (Some(side), Some(score)) = (&hand.handedness, hand.score) {
                        debug!(frame = index, %id, side = %side, score, "mano detectada");
                    }
                    DetectedHand {
                        id,
                        landmarks: hand.landmarks,
                    }
                })
                .collect();

            return Ok(Some(LandmarkFrame { index, hands }));
        }
    }
}

/// Proceso estimador externo que escribe JSON lines por stdout
#[derive(Debug)]
pub struct EstimatorProcess {
    child: Child,
    source: JsonLinesSource<BufReader<ChildStdout>>,
}

impl EstimatorProcess {
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, SourceError> {
        info!(program, ?args, "lanzando estimador de landmarks");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "el estimador no expone stdout")
        })?;

        Ok(Self {
            child,
            source: JsonLinesSource::new(BufReader::new(stdout)),
        })
    }
}

impl LandmarkSource for EstimatorProcess {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        self.source.next_frame()
    }
}

impl Drop for EstimatorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
