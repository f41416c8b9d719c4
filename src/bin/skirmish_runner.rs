//! Headless Skirmish Runner
//!
//! Feeds a stream of reinforcements into the combat coordinator on a sandbox
//! grid and reports how the attacks against the enemy bases went.

use attack_coordinator::combat::unit_data::{MovementType, UnitCatalog, UnitDataProvider};
use attack_coordinator::combat::TargetType;
use attack_coordinator::core::types::{ContinentId, UnitTypeId};
use attack_coordinator::sandbox::{GridMap, SandboxWorld};
use attack_coordinator::world::SectorMap;
use attack_coordinator::{CombatCoordinator, CoordinatorConfig, CoordinatorSnapshot};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Headless Skirmish Runner - drive the combat coordinator on a sandbox map
#[derive(Parser, Debug)]
#[command(name = "skirmish_runner")]
#[command(about = "Run the combat coordinator against sandbox enemy bases")]
struct Args {
    /// Map width in sectors
    #[arg(long, default_value_t = 12)]
    columns: u32,

    /// Map height in sectors
    #[arg(long, default_value_t = 6)]
    rows: u32,

    /// Number of continents (horizontal bands of rows)
    #[arg(long, default_value_t = 2)]
    continents: u32,

    /// Sector edge length
    #[arg(long, default_value_t = 256.0)]
    sector_size: f32,

    /// Number of enemy bases
    #[arg(long, default_value_t = 4)]
    enemy_bases: u32,

    /// Maximum ticks to simulate
    #[arg(long, default_value_t = 6000)]
    max_ticks: u64,

    /// Ticks between reinforcements
    #[arg(long, default_value_t = 15)]
    reinforce_every: u64,

    /// Ticks between rally point refreshes
    #[arg(long, default_value_t = 300)]
    rally_refresh: u64,

    /// Coordinator config (TOML), e.g. data/coordinator/default.toml
    #[arg(long)]
    config: Option<String>,

    /// Unit catalog (TOML); the built-in skirmish catalog if omitted
    #[arg(long)]
    catalog: Option<String>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Include the final coordinator snapshot in the output
    #[arg(long)]
    snapshot: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishResult {
    seed: u64,
    ticks: u64,
    enemy_bases: usize,
    sectors_cleared: usize,
    buildings_destroyed: u32,
    units_spawned: u32,
    units_lost: u32,
    groups: usize,
    attacks_launched: u32,
    attacks_continued: u32,
    attacks_aborted: u32,
    air_support_requests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<CoordinatorSnapshot>,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "attack_coordinator=debug"
    } else {
        "attack_coordinator=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path, e);
            eprintln!("Using default config");
            CoordinatorConfig::default()
        }),
        None => CoordinatorConfig::default(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    config.seed = seed;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let catalog = match &args.catalog {
        Some(path) => UnitCatalog::load(path),
        None => SandboxWorld::skirmish_catalog(),
    };
    let catalog = match catalog {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: Failed to load unit catalog: {}", e);
            std::process::exit(1);
        }
    };

    let reinforcements = reinforcement_types(&catalog);
    if reinforcements.is_empty() {
        eprintln!("Error: Unit catalog has no land or air combat units");
        std::process::exit(1);
    }

    let map = GridMap::new(args.columns, args.rows, args.continents, args.sector_size);
    let mut world = SandboxWorld::new(map, catalog);
    place_enemy_bases(&mut world, args.enemy_bases, &mut rng);
    let enemy_bases = world.map.enemy_sectors().len();
    info!("Placed {} enemy bases", enemy_bases);

    let mut coordinator = CombatCoordinator::new(config);
    let mut units_spawned = 0;
    let mut units_lost = 0;
    let mut buildings_destroyed = 0;

    while world.tick < args.max_ticks && !world.map.enemy_sectors().is_empty() {
        if world.tick % args.reinforce_every.max(1) == 0 {
            if let Some(&unit_type) = reinforcements.choose(&mut rng) {
                let row = rng.gen_range(0..world.map.rows());
                let sector = world.map.sector_at(0, row);
                let position = world.map.attack_position(sector);
                let continent = world.map.continent_of(sector);
                let unit = world.spawn_unit(unit_type, position);
                units_spawned += 1;
                if let Err(e) =
                    coordinator.add_unit(unit, unit_type, continent, &mut world.context())
                {
                    warn!("Reinforcement {} not grouped: {}", unit, e);
                }
            }
        }

        for unit in world.advance() {
            if let Err(e) = coordinator.unit_idle(unit, &mut world.context()) {
                debug!("Ignoring idle {}: {}", unit, e);
            }
        }

        let report = world.resolve_skirmishes(&mut rng);
        buildings_destroyed += report.buildings_destroyed;
        for casualty in report.losses {
            if let Err(e) =
                coordinator.remove_unit(casualty.unit, casualty.attacker, &mut world.context())
            {
                warn!("Lost unit was not grouped: {}", e);
            }
            world.units.kill(casualty.unit);
            units_lost += 1;
        }

        if world.tick % 500 == 0 {
            let spotted = rng.gen_range(0.0..0.5);
            world.threats.set_max_spotted(TargetType::Air, spotted);
        }

        if world.tick % args.rally_refresh.max(1) == 0 {
            coordinator.refresh_rally_points(&mut world.context());
        }

        coordinator.update(&mut world.context());

        if args.verbose && world.tick % 250 == 0 {
            eprintln!(
                "=== Tick {} === groups: {}, attacks: {}, enemy sectors left: {}",
                world.tick,
                coordinator.roster().len(),
                coordinator.attack_manager().active_attacks(),
                world.map.enemy_sectors().len()
            );
        }
    }

    let stats = coordinator.attack_manager().stats();
    let result = SkirmishResult {
        seed,
        ticks: world.tick,
        enemy_bases,
        sectors_cleared: enemy_bases - world.map.enemy_sectors().len(),
        buildings_destroyed,
        units_spawned,
        units_lost,
        groups: coordinator.roster().len(),
        attacks_launched: stats.launched,
        attacks_continued: stats.continued,
        attacks_aborted: stats.aborted,
        air_support_requests: world.air_support.requests().len(),
        snapshot: args.snapshot.then(|| coordinator.snapshot(world.tick)),
    };

    match args.format.as_str() {
        "text" => print_text(&result),
        "json" => print_json(&result),
        _ => {
            eprintln!("Unknown format '{}', defaulting to json", args.format);
            print_json(&result);
        }
    }
}

/// Combat unit types that can move on the sandbox's land-only map
fn reinforcement_types(catalog: &UnitCatalog) -> Vec<UnitTypeId> {
    catalog
        .unit_types()
        .into_iter()
        .filter(|&unit_type| {
            catalog.properties(unit_type).is_some_and(|p| {
                p.category.is_combat()
                    && matches!(
                        p.movement,
                        MovementType::Ground | MovementType::Hover | MovementType::Air
                    )
            })
        })
        .collect()
}

/// Enemy bases in the far half of the map, 2-6 buildings each
fn place_enemy_bases(world: &mut SandboxWorld, count: u32, rng: &mut ChaCha8Rng) {
    let columns = world.map.columns();
    let first_column = (columns / 2).max(2).min(columns.saturating_sub(1));
    let mut candidates: Vec<_> = world
        .map
        .sectors()
        .filter(|info| info.column >= first_column)
        .map(|info| info.id)
        .collect();
    candidates.shuffle(rng);

    for sector in candidates.into_iter().take(count as usize) {
        let buildings = rng.gen_range(2..=6);
        world.place_enemy_base(sector, buildings);
        debug!(
            "Enemy base in {} ({:?}) with {} buildings",
            sector,
            world.map.continent_of(sector).map(ContinentId::index),
            buildings
        );
    }
}

fn print_json(result: &SkirmishResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: Failed to serialize result: {}", e),
    }
}

fn print_text(result: &SkirmishResult) {
    println!("Skirmish Result");
    println!("===============");
    println!("Ticks: {}", result.ticks);
    println!("Enemy bases cleared: {}/{}", result.sectors_cleared, result.enemy_bases);
    println!("Buildings destroyed: {}", result.buildings_destroyed);
    println!("Units spawned: {}, lost: {}", result.units_spawned, result.units_lost);
    println!("Combat groups: {}", result.groups);
    println!(
        "Attacks launched: {}, continued: {}, aborted: {}",
        result.attacks_launched, result.attacks_continued, result.attacks_aborted
    );
    println!("Air support requests: {}", result.air_support_requests);
    println!();
    println!("Seed: {}", result.seed);
    if let Some(snapshot) = &result.snapshot {
        for group in &snapshot.groups {
            println!(
                "  {} {:<20} {:>2}/{:<2} {}",
                group.id,
                group.name,
                group.members,
                group.capacity,
                group.state.label()
            );
        }
    }
}
