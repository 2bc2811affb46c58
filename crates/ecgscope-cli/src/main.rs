use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ecgscope_lib::{
    annotations::{beat_statistics, BeatKind, BeatStatistics, EventFilter},
    config::ViewerConfig,
    io::{csv as csv_io, wfdb as wfdb_io},
    metrics::{
        distribution::{box_plot, histogram},
        events::{
            event_distribution, project_events_with_tolerance, visible_events, EventValue,
        },
        spectrum::spectrogram_values,
        stats::describe,
    },
    navigation::Viewport,
    plot::{figure_from_spectrum, figure_from_window, Figure, PlotBackend, Series},
    signal::{BeatEvent, Lead, WindowedSeries},
    store::{MemoryStore, RecordInfo, SampleStore},
    views::{render_view, StatView},
    window::fetch_record_window,
};
use env_logger::Env;
use log::{info, warn};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
};

#[derive(Parser)]
#[command(
    name = "ecgscope",
    version,
    about = "ecgscope: windowed MIT-BIH ECG review tools"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// TOML file overriding sample rate, point budget, bins and tolerances
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// MIT-BIH dashboard CSV (one row per sample)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
    /// WFDB header (.hea); the record id is the file stem
    #[arg(long, global = true)]
    wfdb_header: Option<PathBuf>,
    /// WFDB annotation file (.atr) for the header's record
    #[arg(long, global = true)]
    annotations: Option<PathBuf>,
    /// Lead names for the WFDB channels, in header order
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        default_value = "MLII,V5"
    )]
    wfdb_leads: Vec<Lead>,
}

#[derive(Args)]
struct WindowArgs {
    #[arg(long)]
    record: String,
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// Window end in seconds (defaults to start + configured window length)
    #[arg(long)]
    end: Option<f64>,
}

impl WindowArgs {
    fn fetch<S: SampleStore + ?Sized>(
        &self,
        store: &S,
        cfg: &ViewerConfig,
    ) -> Result<WindowedSeries> {
        let end = self.end.unwrap_or(self.start + cfg.default_window_s);
        fetch_record_window(store, &self.record, self.start, end, cfg)
            .with_context(|| format!("fetching window of record {}", self.record))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List stored records with their leads and duration
    Records,
    /// Decimated multi-lead window in the dashboard JSON shape
    Window {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Mean/median/mode/std-dev/min/max of one lead over a window
    Stats {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        lead: Lead,
    },
    /// Equal-width histogram of one lead
    Histogram {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        lead: Lead,
        #[arg(long)]
        bins: Option<usize>,
    },
    /// Nearest-rank five-number summary of one lead
    Boxplot {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        lead: Lead,
    },
    /// Hann-windowed magnitude spectrum of one lead
    Spectrogram {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        lead: Lead,
        /// Also render the spectrum to this PNG
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Beat events in a window, with lead values when --lead is given
    Events {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        lead: Option<Lead>,
        #[arg(long, default_value = "all")]
        event_type: EventFilter,
    },
    /// Share of each beat type among a record's events
    Distribution {
        #[arg(long)]
        record: String,
        #[arg(long, default_value = "all")]
        event_type: EventFilter,
    },
    /// Per-symbol beat counts for a record
    BeatStats {
        #[arg(long)]
        record: String,
    },
    /// Evaluate a chart view given as JSON, e.g. '{"type":"histogram","lead":"MLII"}'
    View {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        spec: String,
    },
    /// Record info, events and beat statistics in one payload
    Overview {
        #[arg(long)]
        record: String,
    },
    /// Replay paging and zoom steps over a record and print the final viewport
    Navigate {
        #[arg(long)]
        record: String,
        /// Window length in seconds (defaults to the configured window)
        #[arg(long)]
        window: Option<f64>,
        /// Steps applied in order: prev, next, start, goto:<s>, zoom:<s>, reset
        #[arg(long = "step", value_delimiter = ',')]
        steps: Vec<NavStep>,
    },
    /// Render a window to PNG via plotters
    Plot {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut cfg = ViewerConfig::load(cli.config.as_deref())?;
    let store = load_store(&cli.source, &mut cfg)?;
    info!("loaded {} record(s)", store.len());

    match cli.command {
        Commands::Records => print_json(&store.list_records()?)?,
        Commands::Window { window } => print_json(&window.fetch(&store, &cfg)?)?,
        Commands::Stats { window, lead } => {
            let series = window.fetch(&store, &cfg)?;
            print_json(&describe(&series, lead))?
        }
        Commands::Histogram { window, lead, bins } => {
            let series = window.fetch(&store, &cfg)?;
            print_json(&histogram(&series, lead, bins.unwrap_or(cfg.histogram_bins)))?
        }
        Commands::Boxplot { window, lead } => {
            let series = window.fetch(&store, &cfg)?;
            print_json(&box_plot(&series, lead))?
        }
        Commands::Spectrogram { window, lead, out } => {
            cmd_spectrogram(&store, &cfg, &window, lead, out.as_deref())?
        }
        Commands::Events {
            window,
            lead,
            event_type,
        } => cmd_events(&store, &cfg, &window, lead, event_type)?,
        Commands::Distribution { record, event_type } => {
            let events = store.fetch_events(&record)?;
            print_json(&event_distribution(&events, event_type))?
        }
        Commands::BeatStats { record } => {
            let events = store.fetch_events(&record)?;
            print_json(&beat_statistics(&record, &events))?
        }
        Commands::View { window, spec } => {
            let view: StatView = serde_json::from_str(&spec).context("parsing --spec")?;
            let series = window.fetch(&store, &cfg)?;
            let events = store.fetch_events(&window.record)?;
            print_json(&render_view(&view, &series, &events, &cfg))?
        }
        Commands::Overview { record } => cmd_overview(&store, &record)?,
        Commands::Navigate {
            record,
            window,
            steps,
        } => {
            let info = store.record_info(&record)?;
            let mut viewport = Viewport::from_config(info.duration_seconds, &cfg);
            if let Some(window) = window {
                viewport.set_window(window);
            }
            for step in &steps {
                step.apply(&mut viewport, &cfg);
            }
            print_json(&viewport)?
        }
        Commands::Plot { window, out } => {
            let series = window.fetch(&store, &cfg)?;
            let events = store.fetch_events(&window.record)?;
            let fig = figure_from_window(&series, &events, cfg.max_points);
            PngBackend::new(&out).draw(&fig)?;
            info!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Build the store for the selected source. A WFDB header's sampling frequency
/// replaces the configured rate so window bounds and event times share one clock.
fn load_store(source: &SourceArgs, cfg: &mut ViewerConfig) -> Result<MemoryStore> {
    if let Some(path) = &source.csv {
        return csv_io::read_dashboard_csv(path, cfg.sample_rate);
    }
    if let Some(header) = &source.wfdb_header {
        let record_id = header
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("cannot derive record id from {}", header.display()))?
            .to_string();
        let mut data = wfdb_io::load_wfdb_record(header, &source.wfdb_leads)?;
        if data.sample_rate != cfg.sample_rate {
            warn!(
                "{} is sampled at {} Hz, overriding configured sample rate {} Hz",
                header.display(),
                data.sample_rate,
                cfg.sample_rate
            );
            cfg.sample_rate = data.sample_rate;
        }
        if let Some(atr) = &source.annotations {
            data.events = wfdb_io::load_wfdb_events(atr, data.sample_rate)?;
        }
        let mut store = MemoryStore::new();
        store.insert_record(record_id, data);
        return Ok(store);
    }
    bail!("no data source: pass --csv or --wfdb-header")
}

fn cmd_spectrogram(
    store: &MemoryStore,
    cfg: &ViewerConfig,
    window: &WindowArgs,
    lead: Lead,
    out: Option<&Path>,
) -> Result<()> {
    let series = window.fetch(store, cfg)?;
    let bins = spectrogram_values(&series.lead_values(lead), f64::from(cfg.sample_rate));
    if let Some(path) = out {
        let title = format!("Record {} {} spectrum", window.record, lead);
        PngBackend::new(path).draw(&figure_from_spectrum(&title, &bins))?;
    }
    print_json(&bins)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NavStep {
    Previous,
    Next,
    Start,
    GoTo(f64),
    Zoom(f64),
    Reset,
}

impl FromStr for NavStep {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let seconds = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| format!("bad time '{v}' in step '{s}'"))
        };
        match s.trim().split_once(':') {
            Some(("goto", v)) => Ok(Self::GoTo(seconds(v)?)),
            Some(("zoom", v)) => Ok(Self::Zoom(seconds(v)?)),
            None => match s.trim() {
                "prev" => Ok(Self::Previous),
                "next" => Ok(Self::Next),
                "start" => Ok(Self::Start),
                "reset" => Ok(Self::Reset),
                other => Err(format!("unknown step '{other}'")),
            },
            Some(_) => Err(format!("unknown step '{s}'")),
        }
    }
}

impl NavStep {
    fn apply(self, viewport: &mut Viewport, cfg: &ViewerConfig) {
        match self {
            NavStep::Previous => viewport.previous(),
            NavStep::Next => viewport.next(),
            NavStep::Start => viewport.go_to_start(),
            NavStep::GoTo(t) => viewport.go_to(t),
            NavStep::Zoom(t) => viewport.zoom_to_event(t, cfg),
            NavStep::Reset => viewport.reset_zoom(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EventsOutput {
    Events(Vec<BeatEvent>),
    Values(Vec<EventValue>),
}

fn cmd_events(
    store: &MemoryStore,
    cfg: &ViewerConfig,
    window: &WindowArgs,
    lead: Option<Lead>,
    filter: EventFilter,
) -> Result<()> {
    let events = store.fetch_events(&window.record)?;
    let end = window.end.unwrap_or(window.start + cfg.default_window_s);
    let visible = visible_events(&events, window.start, end - window.start, filter);
    let output = match lead {
        None => EventsOutput::Events(visible),
        Some(lead) => {
            let series = window.fetch(store, cfg)?;
            EventsOutput::Values(project_events_with_tolerance(
                &series,
                lead,
                &visible,
                filter,
                cfg.event_tolerance_s,
            ))
        }
    };
    print_json(&output)
}

/// Fetch the three dashboard panels concurrently and join them.
fn cmd_overview(store: &MemoryStore, record: &str) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Overview {
        record: RecordInfo,
        events: Vec<BeatEvent>,
        statistics: BeatStatistics,
        beat_kinds: Vec<BeatKind>,
    }

    let (info, events, statistics) = thread::scope(|scope| {
        let info = scope.spawn(|| store.record_info(record));
        let events = scope.spawn(|| store.fetch_events(record));
        let statistics = scope.spawn(|| {
            store
                .fetch_events(record)
                .map(|events| beat_statistics(record, &events))
        });
        (info.join(), events.join(), statistics.join())
    });
    let join_err = |_| anyhow!("overview worker panicked");
    let events = events.map_err(join_err)??;
    let mut beat_kinds: Vec<BeatKind> = Vec::new();
    for event in &events {
        if !beat_kinds.contains(&event.kind) {
            beat_kinds.push(event.kind);
        }
    }
    print_json(&Overview {
        record: info.map_err(join_err)??,
        events,
        statistics: statistics.map_err(join_err)??,
        beat_kinds,
    })
}

/// PNG renderer for `Figure`s.
struct PngBackend {
    path: PathBuf,
}

impl PngBackend {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
        let (x_max, y_max) = (
            if x_max > x_min { x_max } else { x_min + 1.0 },
            if y_max > y_min { y_max } else { y_min + 1.0 },
        );
        let backend = BitMapBackend::new(&self.path, (1000, 480));
        let root = backend.into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
        for marker in &fig.markers {
            let (r, g, b) = marker.color.rgb();
            chart.draw_series(LineSeries::new(
                [(marker.x, y_min), (marker.x, y_max)],
                &RGBColor(r, g, b),
            ))?;
        }
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        &RGBColor(r, g, b),
                    ))?;
                }
            }
        }
        root.present()?;
        Ok(())
    }
}
