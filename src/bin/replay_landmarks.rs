use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use manos::config::DaemonConfig;
use manos::landmark_source::ReplaySource;
use manos::{FrameDriver, GestureEngine};

/// Reproduce una grabación CSV (frame,hand,landmark,x,y,z) y muestra los
/// gestos y transiciones de cada frame
#[derive(Parser, Debug)]
#[command(name = "replay_landmarks")]
struct Args {
    csv: PathBuf,

    /// Configuración del clasificador y el tracker
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mostrar sólo los frames con transiciones
    #[arg(long)]
    changes_only: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    println!("🎞️  Reproduciendo landmarks desde {:?}", args.csv);

    let config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("configuración inválida en {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    let mut source = ReplaySource::from_csv(&args.csv)
        .with_context(|| format!("no se pudo leer {}", args.csv.display()))?;
    let total = source.remaining();

    let mut driver = FrameDriver::new(config.classifier(), config.tracker(), GestureEngine::new());
    let summary = driver.run(&mut source, &AtomicBool::new(false), |report| {
        if args.changes_only && report.transitions.is_empty() {
            return;
        }
        println!(
            "  {:>5} | manos={} | gestos={:?} | +{:?} -{:?}",
            report.index,
            report.hands,
            report.symbols,
            report.transitions.appeared,
            report.transitions.disappeared,
        );
    })?;

    println!(
        "\n✅ {} frames: {} procesados, {} descartados",
        total, summary.frames_processed, summary.frames_skipped
    );
    println!("   Gestos activos al final: {:?}", driver.engine().active());
    Ok(())
}
