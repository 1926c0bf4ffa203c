//! Headless Battle Runner
//!
//! Runs AI vs AI battles and prints the battle report as JSON or text.

use std::process::ExitCode;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sangoku_tactics::battle::{
    ArmsType, BattleMap, BattleParams, BattleReport, BattleRules, BattleSystem, CombatantSnapshot,
    Side, SkillCatalog,
};
use sangoku_tactics::core::BattleConfig;
use tracing_subscriber::EnvFilter;

/// Headless Battle Runner - AI vs AI battles
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run an AI vs AI battle and print the report")]
struct Args {
    /// Combatants per side
    #[arg(long, default_value_t = 5)]
    units: u32,

    /// Map width in cells
    #[arg(long, default_value_t = 20)]
    map_width: u32,

    /// Map height in cells
    #[arg(long, default_value_t = 15)]
    map_height: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Treat the battle as a siege (attacker victory captures the city)
    #[arg(long)]
    siege: bool,

    /// Battle config TOML (defaults built in)
    #[arg(long)]
    config: Option<String>,

    /// Rule tables TOML (defaults built in)
    #[arg(long)]
    rules: Option<String>,

    /// Skill catalog TOML (defaults built in)
    #[arg(long)]
    skills: Option<String>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle event log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(report) => {
            print_report(&report, &args.format);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("battle_runner: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<BattleReport, String> {
    let config = match &args.config {
        Some(path) => BattleConfig::load(path).map_err(|e| format!("config {}: {}", path, e))?,
        None => BattleConfig::default(),
    };
    let rules = match &args.rules {
        Some(path) => BattleRules::load(path).map_err(|e| format!("rules {}: {}", path, e))?,
        None => BattleRules::default(),
    };
    let skills = match &args.skills {
        Some(path) => SkillCatalog::load(path).map_err(|e| format!("skills {}: {}", path, e))?,
        None => SkillCatalog::default(),
    };

    // Determine seed
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(seed, units = args.units, "Generating armies");

    let map = BattleMap::generate(args.map_width, args.map_height, &mut rng);
    let attackers = create_army(1, args.units, &mut rng);
    let defenders = create_army(1 + args.units, args.units, &mut rng);

    let mut system = BattleSystem::new(config, rules, skills);
    let id = system
        .init_battle(BattleParams {
            attackers,
            defenders,
            map: Some(map),
            seed: Some(seed),
            is_siege: args.siege,
        })
        .map_err(|e| e.to_string())?;

    if args.verbose {
        // Drive turns by hand so the log can be streamed
        loop {
            let battle = system.battle_mut(id).map_err(|e| e.to_string())?;
            for event in battle.drain_events() {
                eprintln!("  [{}] {:?}: {}", event.turn, event.event_type, event.description);
            }
            if battle.is_over() {
                break;
            }
            system.start_turn(id).map_err(|e| e.to_string())?;
            if system.battle(id).map_err(|e| e.to_string())?.is_over() {
                continue;
            }
            system.run_ai_turn(id).map_err(|e| e.to_string())?;
        }
        system.conclude(id).map_err(|e| e.to_string())
    } else {
        system.auto_resolve(id).map_err(|e| e.to_string())
    }
}

/// Random officers with ids starting at `first_id`
fn create_army(first_id: u32, count: u32, rng: &mut ChaCha8Rng) -> Vec<CombatantSnapshot> {
    (0..count)
        .map(|i| {
            let id = first_id + i;
            let arms_type = ArmsType::ALL[rng.gen_range(0..ArmsType::ALL.len())];
            CombatantSnapshot::new(
                id,
                &format!("Officer {}", id),
                rng.gen_range(1..=15),
                rng.gen_range(40..=100),
                rng.gen_range(40..=100),
                arms_type,
                rng.gen_range(5..=30) * 100,
            )
        })
        .collect()
}

fn print_report(report: &BattleReport, format: &str) {
    match format {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Winner: {:?}", report.winner);
            println!("Turns: {}", report.turns);
            println!("City captured: {}", report.city_captured);
            println!("Survivors: {}", report.survivors.len());
            println!();
            for unit in &report.units {
                println!(
                    "  {:<12} {:?} alive={} arms={} dealt={} taken={} kills={} exp={}",
                    unit.name,
                    unit.side,
                    unit.alive,
                    unit.arms_remaining,
                    unit.damage_dealt,
                    unit.damage_taken,
                    unit.kills,
                    unit.experience
                );
            }
            println!();
            println!(
                "Experience: attacker {} / defender {}",
                report.total_experience(Side::Attacker),
                report.total_experience(Side::Defender)
            );
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("battle_runner: failed to encode report: {}", e),
            }
        }
    }
}
