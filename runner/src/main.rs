// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for hosted bot games, batches and inspection
// ═══════════════════════════════════════════════════════════════════════

use clap::{Parser, Subcommand};
use nightfall_engine::setup::default_roles;
use nightfall_engine::{Role, VoteResults};
use nightfall_session::{
    drive_room, make_agents, run_batch, seats_for, Coordinator, MemoryStore, RoomChannels,
    RoomStore, SessionConfig, SessionError, SqliteStore,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nightfall", about = "One-night social deduction game host")]
struct Cli {
    /// SQLite file for room records (overrides NIGHTFALL_DB)
    #[arg(long, global = true)]
    db: Option<String>,
    /// Log filter (overrides NIGHTFALL_LOG)
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host one room and let bots play it through the coordinator
    Play {
        /// Random when omitted
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, default_value_t = 5)]
        players: u32,
        /// Agent type: "random", "heuristic" or "mixed"
        #[arg(short, long, default_value = "heuristic")]
        agent: String,
        /// Comma-separated role names, players + 3 of them
        #[arg(short, long, value_delimiter = ',')]
        roles: Vec<String>,
        #[arg(long, default_value = "table")]
        room: String,
    },
    /// Play N headless games in parallel and report win rates
    Simulate {
        #[arg(short, long, default_value_t = 1000)]
        games: usize,
        #[arg(short, long, default_value_t = 5)]
        players: u32,
        #[arg(short, long, default_value = "random")]
        agent: String,
        #[arg(short, long, value_delimiter = ',')]
        roles: Vec<String>,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
    /// List stored rooms, or dump one as JSON
    Inspect {
        room: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = SessionConfig::from_env();
    if let Some(db) = cli.db {
        config.database = Some(db);
    }
    if let Some(log) = cli.log {
        config.log_filter = log;
    }

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(nightfall_session::config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Play { seed, players, agent, roles, room } => {
            let seed = seed.unwrap_or_else(rand::random);
            cmd_play(&config, &room, seed, players, &agent, &roles).await
        }
        Commands::Simulate { games, players, agent, roles, seed } => {
            cmd_simulate(games, players, &agent, &roles, seed)
        }
        Commands::Inspect { room } => cmd_inspect(&config, room.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn parse_roles(names: &[String], players: u32) -> Result<Vec<Role>, String> {
    if names.is_empty() {
        return Ok(default_roles(players as usize));
    }
    names.iter().map(|n| n.parse::<Role>()).collect()
}

fn open_store(config: &SessionConfig) -> Result<Arc<dyn RoomStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn RoomStore> = match &config.database {
        Some(path) => Arc::new(SqliteStore::open(path)?) as Arc<dyn RoomStore>,
        None => Arc::new(MemoryStore::new()) as Arc<dyn RoomStore>,
    };
    Ok(store)
}

async fn cmd_play(
    config: &SessionConfig,
    room: &str,
    seed: u64,
    players: u32,
    agent_type: &str,
    role_names: &[String],
) -> CmdResult {
    let roles = parse_roles(role_names, players)?;
    println!("=== Nightfall ===\n");
    println!("Room '{}': seed={}, players={}, agent={}", room, seed, players, agent_type);
    println!("Roles: {}\n", roles.iter().map(|r| r.name()).collect::<Vec<_>>().join(", "));

    let store = open_store(config)?;
    let channels = Arc::new(RoomChannels::new(config.channel_capacity));
    let coordinator = Coordinator::new(store, channels.clone());
    let mut inbox = channels
        .subscribe(room)
        .ok_or("notification channels unavailable")?;

    match coordinator.open_room(room, seats_for(players)).await {
        Err(SessionError::RoomExists(_)) => coordinator.restart(room).await?,
        other => other?,
    }
    coordinator.start_game(room, &roles, seed).await?;

    let mut agents = make_agents(agent_type, players, seed);
    let results = drive_room(&coordinator, room, &mut agents, Some(&mut inbox), 50_000).await?;
    print_results(&results);
    Ok(())
}

fn print_results(results: &VoteResults) {
    println!("Night:");
    for entry in &results.night_log {
        println!("  [{}] {}", entry.role, entry.description);
    }

    println!("\nVotes:");
    for count in &results.breakdown {
        println!("  {:?}: {}", count.target, count.votes);
    }

    println!("\nCards:");
    for card in &results.cards {
        println!(
            "  {:10} {:>14} -> {:<14} {}",
            card.name,
            card.original_role.name(),
            card.role.name(),
            if card.did_win { "WIN" } else { "" },
        );
    }
    println!("  center: {}", results.center.iter().map(|r| r.name()).collect::<Vec<_>>().join(", "));

    let winners: Vec<String> = results.winners.iter().map(|t| t.to_string()).collect();
    println!("\nWinners: {}", if winners.is_empty() { "nobody".to_string() } else { winners.join(" + ") });
    println!("  {}", results.win_reason);
}

fn cmd_simulate(games: usize, players: u32, agent_type: &str, role_names: &[String], seed: u64) -> CmdResult {
    let roles = parse_roles(role_names, players)?;
    println!("=== Simulation: {} games, {} players, agent={} ===\n", games, players, agent_type);

    let summary = run_batch(games, players, &roles, agent_type, seed);

    let finished = summary.games - summary.failed;
    let pct = |n: usize| if finished > 0 { n as f64 / finished as f64 * 100.0 } else { 0.0 };
    println!("--- Summary ({} games, {} errors) ---", summary.games, summary.failed);
    println!("  {:10}: {:>6} wins ({:.1}%)", "Village", summary.village, pct(summary.village));
    println!("  {:10}: {:>6} wins ({:.1}%)", "Werewolf", summary.werewolf, pct(summary.werewolf));
    println!("  {:10}: {:>6} wins ({:.1}%)", "Tanner", summary.tanner, pct(summary.tanner));
    println!("  {:10}: {:>6}", "Nobody", summary.nobody);
    Ok(())
}

fn cmd_inspect(config: &SessionConfig, room: Option<&str>) -> CmdResult {
    let path = config.database.as_deref().ok_or("no database configured; pass --db or set NIGHTFALL_DB")?;
    let store = SqliteStore::open(path)?;

    let Some(room) = room else {
        let rooms = store.rooms()?;
        if rooms.is_empty() {
            println!("No rooms stored in {}", path);
        }
        for room in rooms {
            println!("{}", room);
        }
        return Ok(());
    };

    match store.load(room)? {
        Some(game) => {
            println!("{}", serde_json::to_string_pretty(&game)?);
            println!("\nnight log rows: {}", store.log_rows(room)?);
        }
        None => println!("Room '{}' not found", room),
    }
    Ok(())
}
