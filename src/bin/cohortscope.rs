use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cohortscope::{
    ChartGeometry, ChartView, ControlsView, Dataset, Dispatcher, Engine, EngineConfig, Field,
    Generation, IntervalTicker, Player, ScopeResult, Snapshot, TooltipView, View, format_dollars,
    render_frame,
};

#[derive(Parser, Debug)]
#[command(name = "cohortscope", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a dataset's cohorts.
    Inspect(InspectArgs),
    /// Compute chart geometry for one fractional year as JSON.
    Frame(FrameArgs),
    /// Run a full sweep headless through the real dispatcher.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input CSV with year,age,income columns.
    #[arg(long)]
    data: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input CSV with year,age,income columns.
    #[arg(long)]
    data: PathBuf,

    /// Fractional scrub position, e.g. 1990.5.
    #[arg(long)]
    year: f64,

    /// Birth year to highlight (repeatable, max 2).
    #[arg(long = "highlight")]
    highlights: Vec<i32>,

    /// Chart body width in pixels.
    #[arg(long, default_value_t = 960.0)]
    width: f64,

    /// Chart body height in pixels.
    #[arg(long, default_value_t = 540.0)]
    height: f64,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input CSV with year,age,income columns.
    #[arg(long)]
    data: PathBuf,

    /// Tick rate of the playback loop.
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn read_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read dataset '{}'", path.display()))?;
    Ok(Dataset::parse_csv(&text)?)
}

#[derive(serde::Serialize)]
struct CohortSummary {
    birth_year: i32,
    generation: &'static str,
    observations: usize,
    peak_income: Option<String>,
}

#[derive(serde::Serialize)]
struct DatasetSummary {
    rows: usize,
    cohorts: usize,
    year_extent: (i32, i32),
    age_extent: (i32, i32),
    income_max: f64,
    by_cohort: Vec<CohortSummary>,
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let dataset = read_dataset(&args.data)?;

    let by_cohort = dataset
        .cohorts()
        .iter()
        .map(|c| CohortSummary {
            birth_year: c.birth_year,
            generation: Generation::for_birth_year(c.birth_year).label(),
            observations: c.points.len(),
            peak_income: dataset
                .peak_income(c.birth_year)
                .map(|p| format!("{}, age {}, {}", format_dollars(p.income), p.age, p.year)),
        })
        .collect();

    let summary = DatasetSummary {
        rows: dataset.points().len(),
        cohorts: dataset.cohorts().len(),
        year_extent: dataset.year_extent(),
        age_extent: dataset.age_extent(),
        income_max: dataset.income_max(),
        by_cohort,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.highlights.len() <= 2,
        "at most 2 cohorts can be highlighted"
    );

    let dataset = read_dataset(&args.data)?;
    let geometry = ChartGeometry::new(&dataset, args.width, args.height)?;

    let mut slots = [None, None];
    for (slot, born) in slots.iter_mut().zip(&args.highlights) {
        *slot = Some(*born);
    }

    let frame = render_frame(&dataset, &geometry, args.year, &slots);
    let json = serde_json::to_string_pretty(&frame)?;

    match args.out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("write frame '{}'", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Prints each round-year change; its silence between integer years is the
/// dispatcher's field gating at work.
struct YearLogView;

impl View for YearLogView {
    fn name(&self) -> &'static str {
        "year-log"
    }

    fn watched(&self) -> &'static [Field] {
        &[Field::RoundYear]
    }

    fn update(&mut self, snapshot: &Snapshot, _changed: &[Field]) -> ScopeResult<()> {
        println!("year {}", snapshot.round_year);
        Ok(())
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let dataset = Arc::new(read_dataset(&args.data)?);
    let config = EngineConfig::for_dataset(&dataset);
    let engine = Engine::new(config)?;

    let geometry = ChartGeometry::new(&dataset, 960.0, 540.0)?;
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(Box::new(ChartView::new(Arc::clone(&dataset), geometry)));
    dispatcher.register(Box::new(ControlsView::new(config.start_year)));
    dispatcher.register(Box::new(TooltipView::new(
        Arc::clone(&dataset),
        config.start_year,
    )));
    dispatcher.register(Box::new(YearLogView));

    let ticks = IntervalTicker::new(args.fps)?;
    let mut player = Player::new(engine, dispatcher, ticks);

    player.engine_mut().toggle_animation();
    let frames = player.run_until_idle();

    println!(
        "swept {}..{} in {} frames",
        config.start_year, config.end_year, frames
    );
    Ok(())
}
