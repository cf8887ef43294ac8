//! hearsay-runner: headless driver for the reputation pipeline.
//!
//! Usage:
//!   hearsay-runner --scenario data/scenarios/market_rescue.json --ticks 30 --db run.db
//!   hearsay-runner --scenario data/scenarios/market_rescue.json --ipc-mode
//!   hearsay-runner --scenario data/scenarios/market_rescue.json --db run.db --replay <session>

mod scenario;

use anyhow::Result;
use hearsay_core::{
    config::ReputationConfig,
    engine::ReputationEngine,
    event::ReputationEventInput,
    profile::{ScopeKey, ScopeKind},
    query::{cell_heatmap, top_traits, DEFAULT_TOP_TRAITS},
    store::JournalStore,
    world::StaticWorld,
};
use scenario::{Scenario, ScenarioStep};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Ingest {
        event: ReputationEventInput,
    },
    Tick {
        #[serde(default = "one")]
        count: u64,
        #[serde(default)]
        seconds: Option<f64>,
    },
    GetProfile {
        scope: ScopeKey,
    },
    GetHeatmap,
    Quit,
}

fn one() -> u64 {
    1
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 30u64);
    let tick_seconds = parse_arg(&args, "--tick-seconds", 60.0f64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    let scenario_path = str_arg(&args, "--scenario").unwrap_or("./data/scenarios/market_rescue.json");
    let replay = str_arg(&args, "--replay");

    let config = match ReputationConfig::load(data_dir) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{e}; using built-in defaults");
            ReputationConfig::default()
        }
    };
    let scenario = Scenario::load(scenario_path)?;
    let world = scenario.world()?;

    let store = JournalStore::open(db)?;
    store.migrate()?;

    if let Some(session_id) = replay {
        let engine = ReputationEngine::replay(&store, session_id, config, &world)?;
        print_summary(&engine, &scenario.name);
        return Ok(());
    }

    let session_id = format!("session-{seed}-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"));
    let mut engine = ReputationEngine::new(session_id, seed, config).with_journal(store)?;

    if ipc_mode {
        run_ipc_loop(&mut engine, &world, tick_seconds)?;
    } else {
        println!("hearsay-runner");
        println!("  seed:      {seed}");
        println!("  scenario:  {scenario_path}");
        println!("  ticks:     {ticks} x {tick_seconds}s");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();

        run_scenario(&mut engine, &scenario, &world, tick_seconds)?;
        engine.run_ticks(ticks, tick_seconds)?;
        print_summary(&engine, &scenario.name);
    }

    Ok(())
}

fn run_scenario(
    engine:       &mut ReputationEngine,
    scenario:     &Scenario,
    world:        &StaticWorld,
    tick_seconds: f64,
) -> Result<()> {
    for step in &scenario.steps {
        match step {
            ScenarioStep::Ingest { event } => {
                let report = engine.ingest_event(event.clone(), world)?;
                println!(
                    "  ingest {} -> witnesses {} ({} rumor-only), records {}",
                    report.event_id, report.witnesses, report.rumor_only, report.records
                );
            }
            ScenarioStep::Tick { count, seconds } => {
                engine.run_ticks(*count, seconds.unwrap_or(tick_seconds))?;
            }
        }
    }
    Ok(())
}

fn run_ipc_loop(engine: &mut ReputationEngine, world: &StaticWorld, tick_seconds: f64) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unrecognized IPC line: {}", buffer.trim());
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Ingest { event } => serde_json::to_value(engine.ingest_event(event, world)?)?,
            IpcCommand::Tick { count, seconds } => {
                serde_json::to_value(engine.run_ticks(count, seconds.unwrap_or(tick_seconds))?)?
            }
            IpcCommand::GetProfile { scope } => serde_json::json!({
                "profile": engine.read_profile(&scope),
                "top_traits": top_traits(engine.profiles(), &scope, DEFAULT_TOP_TRAITS),
            }),
            IpcCommand::GetHeatmap => serde_json::to_value(cell_heatmap(engine.profiles()))?,
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &ReputationEngine, scenario: &str) {
    let profiles = engine.profiles();
    let count = |kind: ScopeKind| profiles.iter().filter(|p| p.scope.kind() == kind).count();

    println!("=== SESSION SUMMARY ===");
    println!("  session:        {}", engine.session_id);
    println!("  scenario:       {scenario}");
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  game time:      {:.0}s", engine.clock.now);
    println!("  events:         {}", engine.events().len());
    println!("  witness scopes: {}", count(ScopeKind::Witness));
    println!("  cell scopes:    {}", count(ScopeKind::Cell));
    println!("  faction scopes: {}", count(ScopeKind::Faction));
    println!("  live rumors:    {}", engine.network().rumor_count());

    println!();
    println!("=== CELL HEATMAP ===");
    let heatmap = cell_heatmap(profiles);
    if heatmap.is_empty() {
        println!("  (no cell opinions yet)");
    }
    for cell in heatmap {
        println!("  {:>8} | {:+.2}", cell.cell_id, cell.value);
    }

    println!();
    println!("=== FACTION TOP TRAITS ===");
    for profile in profiles.iter().filter(|p| p.scope.kind() == ScopeKind::Faction) {
        let top = top_traits(profiles, &profile.scope, DEFAULT_TOP_TRAITS);
        let line: Vec<String> = top.iter().map(|r| format!("{} {:+.1}", r.trait_, r.value)).collect();
        println!("  {:<12} {}", profile.scope.id(), line.join(", "));
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
