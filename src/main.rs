use clap::{Args, Parser, Subcommand};
use repcount::{
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{FixedTicker, FrameEvent, ReaderFrameSource, Runner},
    session::{FrameOutcome, RepetitionRecord, SessionAggregator, SessionSummary},
    store::{SummarySink, WorkoutStore},
    EngineError, ProfileCatalog, TICK_RATE_MS,
};
use std::{
    error::Error,
    fs::File,
    io::{self, BufReader, Write},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// count exercise repetitions and score form from a stream of pose landmarks
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Reads landmark frames (JSON lines) from a pose-estimation model, counts completed repetitions for the chosen exercise, scores each rep's form, and stores the finished workout."
)]
pub struct Cli {
    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// workout database to use instead of the default location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run a workout over a frame stream
    Run(RunArgs),
    /// show stored workout history
    History {
        /// number of recent workouts to list
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// list available exercise profiles
    Profiles,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// exercise identifier (pushup, squat, pullup, or a custom profile)
    #[clap(short = 'e', long)]
    exercise: String,

    /// JSON-lines frame file; reads stdin when omitted
    #[clap(short = 'i', long)]
    input: Option<PathBuf>,

    /// input uses the 17-keypoint MoveNet numbering
    #[clap(long)]
    movenet: bool,

    /// override the minimum dwell between posture changes
    #[clap(long)]
    dwell_ms: Option<u64>,

    /// print the summary and rep events as JSON
    #[clap(long)]
    json: bool,

    /// also print a state event for every frame (JSON lines)
    #[clap(long)]
    events: bool,

    /// do not store the finished workout
    #[clap(long)]
    no_save: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repcount=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();

    match cli.command {
        Command::Run(args) => run_workout(&args, config, cli.db),
        Command::History { limit } => show_history(open_store(cli.db)?, limit),
        Command::Profiles => {
            list_profiles(&ProfileCatalog::from_config(&config));
            Ok(())
        }
    }
}

fn open_store(db: Option<PathBuf>) -> Result<WorkoutStore, Box<dyn Error>> {
    Ok(match db {
        Some(path) => WorkoutStore::open(path)?,
        None => WorkoutStore::open_default()?,
    })
}

fn run_workout(
    args: &RunArgs,
    config: Config,
    db: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let catalog = ProfileCatalog::from_config(&config);
    let mut profile = catalog.get(&args.exercise)?.clone();
    // applies to custom profiles too
    if let Some(dwell) = args.dwell_ms {
        profile.min_dwell_ms = dwell;
    }
    profile.validate()?;

    let source = match &args.input {
        Some(path) => ReaderFrameSource::new(BufReader::new(File::open(path)?), args.movenet),
        None => ReaderFrameSource::new(BufReader::new(io::stdin()), args.movenet),
    };
    let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let mut aggregator = SessionAggregator::with_smoothing(config.smoothing_alpha);
    let mut last_ts = None;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        match runner.step() {
            FrameEvent::Frame(frame) => {
                if !aggregator.is_active() {
                    aggregator.start(&profile, frame.timestamp_ms)?;
                }
                last_ts = Some(frame.timestamp_ms);
                let outcome = aggregator.on_frame(&frame)?;
                report_frame(&mut out, args, &outcome)?;
            }
            FrameEvent::Malformed { line, error } => {
                warn!(line, %error, "skipping malformed frame");
            }
            FrameEvent::Idle => {}
            FrameEvent::EndOfStream => break,
        }
    }

    let Some(end_ms) = last_ts else {
        return Err("no landmark frames received".into());
    };
    let summary = match aggregator.stop(end_ms) {
        Ok(summary) => summary,
        Err(EngineError::EmptySession) => {
            aggregator.abandon();
            return Err(EngineError::EmptySession.into());
        }
        Err(e) => return Err(e.into()),
    };

    report_summary(&mut out, args, &summary)?;

    if !args.no_save {
        let mut store = open_store(db)?;
        let id = store.persist(&summary)?;
        info!(id, "workout stored");
    }

    Ok(())
}

fn report_frame(out: &mut impl Write, args: &RunArgs, outcome: &FrameOutcome) -> io::Result<()> {
    if args.events {
        writeln!(out, "{}", serde_json::to_string(&outcome.state)?)?;
    }
    if let Some(rep) = &outcome.rep {
        if args.json {
            writeln!(out, "{}", serde_json::to_string(rep)?)?;
        } else {
            writeln!(out, "{}", format_rep(rep))?;
        }
    }
    Ok(())
}

fn format_rep(rep: &RepetitionRecord) -> String {
    let angles = rep
        .angles
        .iter()
        .map(|(name, deg)| format!("{name}={deg:.0}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("rep {:>3}  accuracy {:>3}%  {}", rep.sequence, rep.accuracy, angles)
}

fn report_summary(
    out: &mut impl Write,
    args: &RunArgs,
    summary: &SessionSummary,
) -> io::Result<()> {
    if args.json {
        return writeln!(out, "{}", serde_json::to_string_pretty(summary)?);
    }

    writeln!(out)?;
    writeln!(out, "exercise   {}", summary.exercise)?;
    writeln!(out, "reps       {}", summary.rep_count)?;
    writeln!(out, "accuracy   {:.2}%", summary.mean_accuracy)?;
    writeln!(out, "duration   {}", format_duration(summary.duration_secs))?;
    writeln!(out, "calories   {}", summary.calories_burned())?;
    writeln!(out, "intensity  {}", summary.intensity())
}

fn format_duration(secs: f64) -> String {
    let whole = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

fn show_history(store: WorkoutStore, limit: usize) -> Result<(), Box<dyn Error>> {
    let overview = store.overview()?;
    println!(
        "{} workouts, {} reps, {} min, {:.1}% average accuracy",
        overview.total_workouts,
        overview.total_reps,
        (overview.total_duration_secs / 60.0).floor(),
        overview.average_accuracy
    );

    for stats in store.exercise_stats()? {
        println!(
            "  {:<10} {:>4} workouts {:>6} reps  avg {:>5.1}%  best {:>5.1}%",
            stats.exercise,
            stats.total_workouts,
            stats.total_reps,
            stats.average_accuracy,
            stats.best_accuracy
        );
    }

    let recent = store.recent(limit)?;
    if !recent.is_empty() {
        println!();
    }
    for row in recent {
        println!(
            "{}  {:<10} {:>4} reps  {:>5.1}%  {}",
            row.recorded_at.format("%Y-%m-%d %H:%M"),
            row.exercise,
            row.rep_count,
            row.mean_accuracy,
            format_duration(row.duration_secs)
        );
    }
    Ok(())
}

fn list_profiles(catalog: &ProfileCatalog) {
    for id in catalog.ids() {
        if let Ok(profile) = catalog.get(id) {
            let angles = profile
                .angles
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{:<10} {:<12} extended >= {:.0}  flexed <= {:.0}  dwell {}ms  [{}]",
                profile.id,
                profile.display_name(),
                profile.extended_threshold,
                profile.flexed_threshold,
                profile.min_dwell_ms,
                angles
            );
        }
    }
}
