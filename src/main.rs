use std::env;
use std::path::PathBuf;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use fmp_timing::{
    core::{fixture::PageFixture, MonotonicClock, PerformanceTimeline},
    observe, FmpConfig, FmpReport,
};

#[derive(Debug, Clone)]
struct AppConfig {
    fixture: Option<PathBuf>,
    config: Option<PathBuf>,
    viewport: Option<(u32, u32)>,
    json_output: bool,
    json_logs: bool,
    log_level: Level,
}

impl AppConfig {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Self::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--fixture" => {
                    if i + 1 < args.len() {
                        config.fixture = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--config" => {
                    if i + 1 < args.len() {
                        config.config = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--viewport" => {
                    if i + 1 < args.len() {
                        config.viewport = parse_viewport(&args[i + 1]);
                        if config.viewport.is_none() {
                            eprintln!("ignoring malformed --viewport {}, expected WIDTHxHEIGHT", args[i + 1]);
                        }
                        i += 1;
                    }
                }
                "--json" => config.json_output = true,
                "--log-json" => config.json_logs = true,
                "--debug" => config.log_level = Level::DEBUG,
                "--trace" => config.log_level = Level::TRACE,
                _ => {}
            }
            i += 1;
        }

        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fixture: None,
            config: None,
            viewport: None,
            json_output: false,
            json_logs: false,
            log_level: Level::INFO,
        }
    }
}

fn parse_viewport(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.split_once(['x', 'X'])?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

fn setup_logging(level: Level, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let result = if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(app_config: &AppConfig) -> fmp_timing::Result<Option<FmpReport>> {
    let mut config = match &app_config.config {
        Some(path) => FmpConfig::load(path).await?,
        None => FmpConfig::default(),
    };

    let fixture = match &app_config.fixture {
        Some(path) => PageFixture::from_path(path).await?,
        None => {
            info!("No fixture given, replaying the built-in article page");
            PageFixture::demo()
        }
    };

    if let Some([width, height]) = fixture.viewport {
        config.viewport_width = width;
        config.viewport_height = height;
    }
    if let Some((width, height)) = app_config.viewport {
        config.viewport_width = width;
        config.viewport_height = height;
    }

    let (document, mut ids) = fixture.build_document()?;
    let timeline = PerformanceTimeline::new();
    let clock = MonotonicClock::new();

    let (report, replayed) = tokio::join!(
        observe(&document, &timeline, config, clock),
        fixture.replay(&document, &mut ids, &timeline),
    );
    replayed?;
    report
}

fn print_report(report: Option<&FmpReport>, json: bool) -> fmp_timing::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(report) = report else {
        println!("No meaningful paint: nothing in the viewport scored above zero");
        return Ok(());
    };
    match report.fmp_time {
        Some(time) => println!("First meaningful paint: {:.1} ms", time),
        None => println!("First meaningful paint: unresolved"),
    }
    println!(
        "Finalized at {:.1} ms ({:?}) after {} snapshots",
        report.finalized_at_ms, report.reason, report.snapshot_count
    );
    println!(
        "Winner {} scored {:.0} out of {} candidates",
        report.winner, report.winner_score, report.candidate_count
    );
    for element in &report.elements {
        let time = element
            .time
            .map(|t| format!("{:.1} ms", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  <{}> {:?} score {:.0} at {}",
            element.tag, element.weight, element.score, time
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> fmp_timing::Result<()> {
    let app_config = AppConfig::from_args();

    setup_logging(app_config.log_level, app_config.json_logs);

    info!("Starting paint timing replay");
    let started = Instant::now();

    tokio::select! {
        report = run(&app_config) => {
            let report = report.inspect_err(|e| error!("Replay failed: {}", e))?;
            print_report(report.as_ref(), app_config.json_output)?;
        }
        _ = signal::ctrl_c() => {
            warn!("Received SIGINT, abandoning replay");
        }
    }

    info!("Done in {:?}", started.elapsed());
    Ok(())
}
