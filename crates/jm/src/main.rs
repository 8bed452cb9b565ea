//! jm - joymacro CLI
//!
//! Inspect, validate, delete and dry-run replay stored joystick macros.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use joymacro_core::prelude::*;
use joymacro_recorder::macro_tag;
use joymacro_recorder::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jm")]
#[command(about = "joymacro - inspect and replay recorded joystick macros")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "joymacro.toml")]
    config: PathBuf,

    /// Macro directory, overrides the config
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Print machine readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored macros
    List,
    /// Show macro info
    Show {
        number: u32,
        /// Show all events
        #[arg(long)]
        all: bool,
    },
    /// Parse a macro strictly and report the first bad line
    Check {
        number: u32,
    },
    /// Delete a macro
    Delete {
        number: u32,
    },
    /// Play a macro against the wall clock, printing events as they fall due
    Replay {
        number: u32,
        /// Tick period in ms, defaults to the config value
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config path
        #[arg(long)]
        init: bool,
    },
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

fn print_json<T: Serialize>(output: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

#[derive(Serialize)]
struct Summary {
    number: u32,
    events: usize,
    duration_ms: Millis,
    devices: Vec<DeviceId>,
    presses: usize,
    releases: usize,
    axes: usize,
    povs: usize,
}

impl Summary {
    fn of(number: u32, m: &Macro) -> Self {
        let count = |kind: EventKind| m.events().iter().filter(|e| e.kind() == kind).count();
        Self {
            number,
            events: m.len(),
            duration_ms: m.duration_ms(),
            devices: m.devices().iter().copied().collect(),
            presses: count(EventKind::Press),
            releases: count(EventKind::Release),
            axes: count(EventKind::Axis),
            povs: count(EventKind::Pov),
        }
    }
}

struct Ctx {
    config: MacroConfig,
    json: bool,
}

impl Ctx {
    fn library(&self) -> Result<MacroLibrary> {
        Ok(MacroLibrary::with_dir(&self.config.macro_dir)?)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        MacroConfig::load_or_default(&cli.config)
    } else {
        MacroConfig::default()
    };
    if let Some(dir) = cli.dir {
        config.macro_dir = dir;
    }
    let ctx = Ctx { config, json: cli.json };

    let result = match cli.command {
        Commands::List => list(&ctx),
        Commands::Show { number, all } => show(&ctx, number, all),
        Commands::Check { number } => check(&ctx, number),
        Commands::Delete { number } => delete(&ctx, number),
        Commands::Replay { number, tick_ms } => replay(&ctx, number, tick_ms),
        Commands::Config { init } => show_config(&ctx, &cli.config, init),
    };

    if let Err(e) = result {
        if ctx.json {
            if let Some(err) = e.downcast_ref::<Error>() {
                let _ = print_json(&Output::<()>::err(err.clone()));
            }
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list(ctx: &Ctx) -> Result<()> {
    let library = ctx.library()?;
    let mut summaries = Vec::new();
    for n in library.list()? {
        match library.load(n) {
            Ok(m) => summaries.push(Summary::of(n, &m)),
            Err(e) => tracing::warn!("Could not load macro {}: {}", n, e),
        }
    }

    if ctx.json {
        return print_json(&Output::ok(summaries));
    }
    if summaries.is_empty() {
        println!("No macros saved in {}.", library.path().display());
    }
    for s in summaries {
        println!(
            "{}  {} events  {:.2}s",
            macro_tag(s.number),
            s.events,
            s.duration_ms as f64 / 1000.0
        );
    }
    Ok(())
}

fn show(ctx: &Ctx, number: u32, all: bool) -> Result<()> {
    let m = ctx.library()?.load(number)?;
    let summary = Summary::of(number, &m);

    if ctx.json {
        let events = all.then(|| m.events().to_vec());
        return print_json(&Output::ok(serde_json::json!({ "summary": summary, "events": events })));
    }

    println!("Macro: {}", number);
    println!("Events: {}", summary.events);
    println!("Length: {:.3} seconds", summary.duration_ms as f64 / 1000.0);
    println!("Devices: {:?}", summary.devices);
    println!(
        "\nSummary: {} presses, {} releases, {} axis moves, {} POV changes",
        summary.presses, summary.releases, summary.axes, summary.povs
    );
    if all {
        for e in m.events() {
            println!("{:>8}ms  {}", e.t, e.describe());
        }
    }
    Ok(())
}

fn check(ctx: &Ctx, number: u32) -> Result<()> {
    let library = ctx.library()?.strictness(Strictness::Strict);
    let m = library.load(number)?;
    if ctx.json {
        return print_json(&Output::ok(Summary::of(number, &m)));
    }
    println!("Macro {} OK: {} events", number, m.len());
    Ok(())
}

fn delete(ctx: &Ctx, number: u32) -> Result<()> {
    ctx.library()?.delete(number)?;
    if ctx.json {
        return print_json(&Output::ok(serde_json::json!({ "deleted": number })));
    }
    println!("Deleted: {}", number);
    Ok(())
}

fn replay(ctx: &Ctx, number: u32, tick_ms: Option<u64>) -> Result<()> {
    let mut m = ctx.library()?.load(number)?;
    let tick = Duration::from_millis(tick_ms.unwrap_or(ctx.config.tick_ms).max(1));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let clock = SystemClock;
    let idle = VirtualDevice::new();
    let start = clock.now_ms();
    m.start_playing(start)?;
    println!("Replaying macro {} ({:.3}s, Ctrl+C to stop)", number, m.duration_ms() as f64 / 1000.0);

    let mut delivered = 0;
    while m.mode() == Mode::Playing {
        if !running.load(Ordering::SeqCst) {
            m.abort()?;
            println!("Aborted after {} events", delivered);
            return Ok(());
        }
        let now = clock.now_ms();
        for e in m.poll(&idle, now) {
            delivered += 1;
            if ctx.json {
                println!("{}", serde_json::to_string(&e.at(e.t - start))?);
            } else {
                println!("{:>8}ms  (late {:>3}ms)  {}", e.t - start, now - e.t, e.describe());
            }
        }
        std::thread::sleep(tick);
    }

    println!("Done: {} events", delivered);
    Ok(())
}

fn show_config(ctx: &Ctx, path: &std::path::Path, init: bool) -> Result<()> {
    if init {
        ctx.config.save(path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }
    print_json(&Output::ok(&ctx.config))
}
