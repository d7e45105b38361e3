use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use boulder_visualiser_core::{
    analyse, simulate, BoulderId, BoulderRecord, BoulderVizError, DetectionConfig, EngineClock,
    EngineConfig, JsonFileSettingsStore, PersistedSettings, Sample, SettingsPatch, SettingsStore,
    VisualizerEngine,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() -> boulder_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            input,
            threshold,
            min_duration,
        } => run_detect(&input, threshold, min_duration),
        Commands::Simulate {
            boulder_id,
            attempts,
        } => run_simulate(&boulder_id, attempts),
        Commands::Scene {
            input,
            boulder_id,
            config,
            settings,
            store,
            remember,
            output,
        } => run_scene(SceneArgs {
            input,
            boulder_id,
            config,
            settings,
            store,
            remember,
            output,
        }),
    }
}

fn run_detect(
    input: &Path,
    threshold: f64,
    min_duration: f64,
) -> boulder_visualiser_core::Result<()> {
    let samples = read_samples(input)?;
    tracing::info!(?input, samples = samples.len(), threshold, "detecting moves");

    let report = analyse(&samples, DetectionConfig::new(threshold, min_duration))?;
    tracing::info!(
        moves = report.summary.move_count,
        cruxes = report.summary.crux_count,
        rhythm_hz = ?report.rhythm_hz,
        "detection finished"
    );
    write_json(None, &report)
}

fn run_simulate(boulder_id: &str, attempts: usize) -> boulder_visualiser_core::Result<()> {
    let id = parse_boulder_id(boulder_id);
    tracing::info!(boulder = %id, attempts, "simulating attempts");
    write_json(None, &simulate(&id, attempts))
}

struct SceneArgs {
    input: PathBuf,
    boulder_id: String,
    config: Option<PathBuf>,
    settings: Option<PathBuf>,
    store: Option<PathBuf>,
    remember: bool,
    output: Option<PathBuf>,
}

fn run_scene(args: SceneArgs) -> boulder_visualiser_core::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let id = parse_boulder_id(&args.boulder_id);
    let mut store = args.store.as_ref().map(JsonFileSettingsStore::new);
    let settle = config.debounce() + config.reconcile_interval();
    let mut engine = VisualizerEngine::new(config);
    let mut clock = EngineClock::default();

    if let Some(saved) = store.as_ref().map(|store| store.load(&id)).transpose()?.flatten() {
        tracing::info!(
            boulder = %id,
            threshold = saved.move_threshold,
            "restoring persisted detection settings"
        );
        engine.on_settings_changed(saved.to_patch(), clock.now());
    }
    if let Some(path) = &args.settings {
        let patch = SettingsPatch::from_json_str(&std::fs::read_to_string(path)?)?;
        engine.on_settings_changed(patch, clock.now());
    }

    let samples = read_samples(&args.input)?;
    // Settings must be committed before the boulder so detection uses them.
    engine.pump(clock.advance(settle))?;
    engine.on_boulder_loaded(Arc::new(BoulderRecord::new(id.clone(), samples)), clock.now())?;
    let outcome = engine.tick(clock.advance(settle))?;

    let scene = engine.scene();
    tracing::info!(?outcome, primitives = scene.len(), stats = ?engine.stats(), "scene generated");

    if args.remember {
        if let Some(store) = store.as_mut() {
            store.save(&id, PersistedSettings::capture(engine.settings()))?;
            tracing::info!(path = ?store.path(), "saved detection settings");
        } else {
            tracing::warn!("--remember needs --store; nothing saved");
        }
    }

    write_json(args.output.as_deref(), &scene)?;
    engine.dispose();
    Ok(())
}

/// Reads a `time,x,y,z` CSV export.
fn read_samples(path: &Path) -> boulder_visualiser_core::Result<Vec<Sample>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let samples = reader
        .deserialize::<Sample>()
        .map(|row| row.map_err(csv_error))
        .collect::<boulder_visualiser_core::Result<Vec<Sample>>>()?;
    if samples.is_empty() {
        return Err(BoulderVizError::InvalidInput("sample file contains no rows"));
    }
    Ok(samples)
}

fn csv_error(err: csv::Error) -> BoulderVizError {
    BoulderVizError::msg(format!("failed to read samples: {err}"))
}

/// Integers seed the PRNG directly; anything else is hashed as text.
fn parse_boulder_id(raw: &str) -> BoulderId {
    raw.parse::<i64>()
        .map(BoulderId::from)
        .unwrap_or_else(|_| BoulderId::from(raw))
}

fn write_json<T: Serialize>(
    output: Option<&Path>,
    value: &T,
) -> boulder_visualiser_core::Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Boulder move detection and scene generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect moves in a recorded acceleration trace and print them as JSON.
    Detect {
        /// CSV file with `time,x,y,z` columns.
        #[arg(short, long)]
        input: PathBuf,
        /// Magnitude a peak must exceed to count as a move.
        #[arg(long, default_value_t = 12.0)]
        threshold: f64,
        /// Minimum seconds between accepted moves.
        #[arg(long, default_value_t = 0.3)]
        min_duration: f64,
    },
    /// Print the simulated attempt population for a boulder.
    Simulate {
        #[arg(short, long)]
        boulder_id: String,
        #[arg(short, long, default_value_t = 30)]
        attempts: usize,
    },
    /// Run the full engine over a recording and write the scene as JSON.
    Scene {
        /// CSV file with `time,x,y,z` columns.
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        boulder_id: String,
        /// Engine configuration document.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Partial settings document applied over the configured settings.
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// JSON file holding persisted detection settings per boulder.
        #[arg(long)]
        store: Option<PathBuf>,
        /// Save the detection settings used for this boulder to `--store`.
        #[arg(long)]
        remember: bool,
        /// Where to write the scene; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
