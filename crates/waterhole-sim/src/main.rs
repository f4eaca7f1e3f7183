mod board;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use waterhole::{
    Dispatcher, FanoutSink, OccupancySink, Pool, PoolId, PoolLayout, RandomLayout, SimConfig,
    TracingSink,
};

use crate::board::Board;

const DEFAULT_BOARD_EVERY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    random_layout: bool,
    run_for: Option<Duration>,
    board_every: Duration,
    json: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            random_layout: false,
            run_for: None,
            board_every: DEFAULT_BOARD_EVERY,
            json: false,
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let args = match parse_args(&args) {
        Ok(v) => v,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            eprintln!(
                "Usage: waterhole-sim [--config <file.json>] [--random-layout] [--run-for <secs>] [--board-every <ms>] [--json]"
            );
            eprintln!();
            eprintln!("Options:");
            eprintln!("  --config <file>      JSON simulation config [default: built-in]");
            eprintln!("  --random-layout      Draw pool and slot counts at random");
            eprintln!("  --run-for <secs>     Stop after this many seconds [default: until Ctrl-C]");
            eprintln!("  --board-every <ms>   Board refresh interval [default: 1000]");
            eprintln!("  --json               Print final pool snapshots as JSON lines");
            process::exit(2);
        }
    };

    init_tracing();

    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(
                    args.get(i).ok_or("--config requires a value")?,
                ));
            }
            "--random-layout" => parsed.random_layout = true,
            "--run-for" => {
                i += 1;
                let value = args.get(i).ok_or("--run-for requires a value")?;
                let secs: f64 = value
                    .parse()
                    .map_err(|_| format!("invalid --run-for value: {value}"))?;
                let run_for = Duration::try_from_secs_f64(secs)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or_else(|| {
                        format!(
                            "--run-for must be a positive, representable number of seconds, got {value}"
                        )
                    })?;
                parsed.run_for = Some(run_for);
            }
            "--board-every" => {
                i += 1;
                let value = args.get(i).ok_or("--board-every requires a value")?;
                let ms: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid --board-every value: {value}"))?;
                if ms == 0 {
                    return Err("--board-every must be at least 1".to_string());
                }
                parsed.board_every = Duration::from_millis(ms);
            }
            "--json" => parsed.json = true,
            "--help" | "-h" => return Err(String::new()),
            arg => return Err(format!("unknown argument: {arg}")),
        }
        i += 1;
    }

    Ok(parsed)
}

/// `RUST_LOG` wins when set; otherwise `WATERHOLE_LOG` picks the level for
/// our crates. `LOG_FORMAT=json` switches to JSON lines. Output goes to
/// stderr so the board owns stdout.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("WATERHOLE_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("waterhole={level},waterhole_sim={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if args.random_layout {
        config.pools = PoolLayout::Random(RandomLayout::default());
    }
    config.validate().context("invalid simulation config")?;

    let board = Arc::new(Board::new());
    let sink: Arc<dyn OccupancySink> = Arc::new(
        FanoutSink::new()
            .with(board.clone())
            .with(Arc::new(TracingSink)),
    );

    let slot_counts = config.pools.slot_counts();
    let mut pools = Vec::with_capacity(slot_counts.len());
    for (index, &slots) in slot_counts.iter().enumerate() {
        let id = PoolId::new(u32::try_from(index + 1).context("too many pools")?);
        board.register(id, slots);
        pools.push(Arc::new(Pool::new(id, slots).with_sink(Arc::clone(&sink))));
    }
    tracing::info!(pools = ?slot_counts, "Pools ready");

    let dispatcher = Dispatcher::from_config(pools.clone(), &config).spawn();

    let stop = stop_signal(args.run_for);
    tokio::pin!(stop);
    let mut ticker = tokio::time::interval(args.board_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => println!("{}", board.render()),
        }
    }

    let created = dispatcher.actors_created();
    dispatcher.shutdown().await;

    println!("final ({created} actors dispatched)");
    print!("{}", board.render());

    if args.json {
        for pool in &pools {
            println!("{}", serde_json::to_string(&pool.snapshot())?);
        }
    }
    Ok(())
}

async fn stop_signal(run_for: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await
        }
    };
    let deadline = async {
        match run_for {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = deadline => tracing::info!("Run time elapsed, shutting down..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("waterhole-sim")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_flags() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Args::default());
    }

    #[test]
    fn parses_every_flag() {
        let parsed = parse_args(&args(&[
            "--config",
            "sim.json",
            "--random-layout",
            "--run-for",
            "2.5",
            "--board-every",
            "250",
            "--json",
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            Args {
                config: Some(PathBuf::from("sim.json")),
                random_layout: true,
                run_for: Some(Duration::from_millis(2_500)),
                board_every: Duration::from_millis(250),
                json: true,
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse_args(&args(&["--config"])).unwrap_err(),
            "--config requires a value"
        );
        assert_eq!(
            parse_args(&args(&["--run-for", "soon"])).unwrap_err(),
            "invalid --run-for value: soon"
        );
        assert_eq!(
            parse_args(&args(&["--run-for", "1e20"])).unwrap_err(),
            "--run-for must be a positive, representable number of seconds, got 1e20"
        );
        assert_eq!(
            parse_args(&args(&["--run-for", "-1"])).unwrap_err(),
            "--run-for must be a positive, representable number of seconds, got -1"
        );
        assert_eq!(
            parse_args(&args(&["--board-every", "0"])).unwrap_err(),
            "--board-every must be at least 1"
        );
        assert_eq!(
            parse_args(&args(&["--lakes"])).unwrap_err(),
            "unknown argument: --lakes"
        );
        assert_eq!(parse_args(&args(&["-h"])).unwrap_err(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_run_stops_on_its_own() {
        let started = tokio::time::Instant::now();
        stop_signal(Some(Duration::from_secs(3))).await;
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
