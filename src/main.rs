/*
Daemon de gestos de mano

1. Lee frames de landmarks (JSON lines del estimador, o una grabación CSV)
2. Clasifica postura y swipes de cada mano
3. Dispara aparecer/desaparecer por gesto
4. Traduce los gestos a teclas y clicks en un dispositivo uinput

Uso:
    mediapipe_hands.py | ./target/release/manos --input -
    ./target/release/manos --input grabacion.csv --dry-run
    ./target/release/manos --estimator python3 -- mediapipe_hands.py --camera 0

Para escribir en /dev/uinput sin root:
    sg input -c './target/release/manos --input -'
*/

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use manos::config::DaemonConfig;
use manos::daemon::install_callbacks;
use manos::hid::{run_hid_worker, ActionSink, HidCommand, HidOutput, LoggingSink};
use manos::landmark_source::{EstimatorProcess, JsonLinesSource, LandmarkSource, ReplaySource};
use manos::{FrameDriver, GestureEngine};

#[derive(Parser, Debug)]
#[command(name = "manos", version, about = "Gestos de mano -> teclado y ratón")]
struct Args {
    /// Archivo TOML de configuración
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames de entrada: archivo .jsonl, archivo .csv o "-" para stdin
    #[arg(long, conflicts_with = "estimator")]
    input: Option<PathBuf>,

    /// Programa estimador que escribe JSON lines por stdout
    #[arg(long)]
    estimator: Option<String>,

    /// Argumentos para el estimador
    #[arg(last = true)]
    estimator_args: Vec<String>,

    /// Registrar las acciones en el log en vez de usar /dev/uinput
    #[arg(long)]
    dry_run: bool,

    /// No reportar etiquetas de gestos
    #[arg(long)]
    no_labels: bool,
}

fn open_source(args: &Args) -> Result<Box<dyn LandmarkSource>> {
    if let Some(program) = &args.estimator {
        let process = EstimatorProcess::spawn(program, &args.estimator_args)
            .with_context(|| format!("no se pudo lanzar el estimador {program}"))?;
        return Ok(Box::new(process));
    }

    match args.input.as_deref() {
        None => Ok(Box::new(JsonLinesSource::new(io::stdin().lock()))),
        Some(path) if path.as_os_str() == "-" => {
            Ok(Box::new(JsonLinesSource::new(io::stdin().lock())))
        }
        Some(path) if path.extension().is_some_and(|ext| ext == "csv") => {
            let source = ReplaySource::from_csv(path)
                .with_context(|| format!("no se pudo leer {}", path.display()))?;
            Ok(Box::new(source))
        }
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("no se pudo abrir {}", path.display()))?;
            Ok(Box::new(JsonLinesSource::new(BufReader::new(file))))
        }
    }
}

fn spawn_hid_thread(dry_run: bool) -> (Sender<HidCommand>, std::thread::JoinHandle<()>) {
    let (tx, rx) = unbounded::<HidCommand>();

    let handle = std::thread::spawn(move || {
        let mut sink: Box<dyn ActionSink> = if dry_run {
            info!("🧪 Modo dry-run: las acciones sólo se registran");
            Box::new(LoggingSink)
        } else {
            match HidOutput::new() {
                Ok(h) => {
                    info!("✅ HID inicializado (/dev/uinput)");
                    Box::new(h)
                }
                Err(e) => {
                    error!("❌ No se pudo inicializar HID: {}", e);
                    return;
                }
            }
        };

        let applied = run_hid_worker(sink.as_mut(), rx);
        info!(applied, "hilo HID terminado");
    });

    (tx, handle)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("🎯 manos: gestos de mano en tiempo real");

    let config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("configuración inválida en {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    let bindings = config.action_bindings().context("sección [bindings]")?;
    for (symbol, action) in bindings.bound() {
        info!("🔗 {} → {}", symbol, action);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("no se pudo instalar el manejador de Ctrl-C")?;
    }

    let (hid_tx, hid_handle) = spawn_hid_thread(args.dry_run);

    let bindings = Rc::new(RefCell::new(bindings));
    let mut engine = GestureEngine::new();
    let installed = install_callbacks(
        &mut engine,
        Rc::clone(&bindings),
        hid_tx.clone(),
        config.labels.enabled && !args.no_labels,
    );
    debug!(?installed, "callbacks registrados");

    let mut driver = FrameDriver::new(config.classifier(), config.tracker(), engine);
    let mut source = open_source(&args)?;

    info!("🎬 Iniciando reconocimiento...");
    let result = driver.run(&mut source, &cancel, |_| {});

    let dispatched = driver.engine().stats();

    // Soltar lo que haya quedado presionado antes de cerrar el canal
    for command in bindings.borrow_mut().release_all() {
        let _ = hid_tx.send(command);
    }
    drop(driver);
    drop(hid_tx);
    if hid_handle.join().is_err() {
        warn!("el hilo HID terminó con pánico");
    }

    let summary = result.context("error leyendo frames")?;
    info!(
        processed = summary.frames_processed,
        skipped = summary.frames_skipped,
        appears = dispatched.appears,
        disappears = dispatched.disappears,
        "👋 Fin"
    );
    Ok(())
}
