//! Command line front end for the RFID ATM terminal
//!
//! Usage:
//!   rfid-atm init-card --password 1234 --balance 100
//!   rfid-atm run
//!   rfid-atm show-card
//!
//! `run` serves the card file through the simulated reader: the card stays
//! in the field and is swiped again after every operation, until the
//! cardholder picks `E` or standard input ends.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};

use rfid_atm::config::{self, AtmConfig};
use rfid_atm::ledger::{self, ScaleMode, SCALE};
use rfid_atm::{
    ConsoleSink, CycleOutcome, SessionController, SimulatedCard, SimulatedReader, StreamInput,
};

#[derive(Parser)]
#[command(name = "rfid-atm")]
#[command(about = "ATM terminal for MIFARE Classic style RFID tags", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the terminal against a card file
    Run {
        /// Card file (default: card.json in the storage directory)
        #[arg(long)]
        card: Option<PathBuf>,
        /// Configuration file (default: $RFID_ATM_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the configured scale mode
        #[arg(long)]
        scale_mode: Option<ScaleMode>,
    },
    /// Create a card file with a random UID
    ///
    /// Keys and block layout come from the configuration.
    InitCard {
        #[arg(long)]
        card: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        password: String,
        /// Balance digits to store, in storage units
        #[arg(long, default_value_t = 0)]
        balance: u64,
        /// Replace an existing card file
        #[arg(long)]
        force: bool,
    },
    /// Print the contents of a card file
    ShowCard {
        #[arg(long)]
        card: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let code = match cli.command {
        Commands::Run {
            card,
            config,
            scale_mode,
        } => run(card, config, scale_mode),
        Commands::InitCard {
            card,
            config,
            password,
            balance,
            force,
        } => init_card(card, config, &password, balance, force),
        Commands::ShowCard { card, config } => show_card(card, config),
    };
    process::exit(code);
}

fn load_config(path: Option<PathBuf>) -> Option<AtmConfig> {
    match AtmConfig::load(path.as_deref()) {
        Ok(config) => Some(config),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn run(card: Option<PathBuf>, config: Option<PathBuf>, scale_mode: Option<ScaleMode>) -> i32 {
    let Some(mut config) = load_config(config) else {
        return 1;
    };
    if let Some(mode) = scale_mode {
        config.scale_mode = mode;
    }

    let card_path = card.unwrap_or_else(config::default_card_path);
    let card = match SimulatedCard::load(&card_path) {
        Ok(card) => card,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Create a card first with: rfid-atm init-card --password <PASSWORD>");
            return 1;
        }
    };
    info!(
        "Serving card {:?} in {} scale mode",
        card_path, config.scale_mode
    );

    let reader = SimulatedReader::with_card(card)
        .persist_to(&card_path)
        .rearm_on_release(true);
    let mut atm = SessionController::new(
        reader,
        StreamInput::stdin(),
        ConsoleSink::new(io::stdout()),
        &config,
    );

    if atm.start().is_err() {
        return 1;
    }
    match atm.run() {
        CycleOutcome::Exit | CycleOutcome::InputClosed => 0,
        outcome => {
            error!("Unexpected end of session loop: {:?}", outcome);
            1
        }
    }
}

fn init_card(
    card: Option<PathBuf>,
    config: Option<PathBuf>,
    password: &str,
    balance: u64,
    force: bool,
) -> i32 {
    let Some(config) = load_config(config) else {
        return 1;
    };
    let path = card.unwrap_or_else(config::default_card_path);

    let mut new_card = SimulatedCard::random(config.keys);
    if let Err(e) = new_card.provision(&config, balance, password) {
        eprintln!("Error: {}", e);
        return 1;
    }

    let saved = if force {
        new_card.save(&path)
    } else {
        new_card.create(&path)
    };
    if let Err(e) = saved {
        eprintln!("Error: {}", e);
        return 1;
    }

    println!("Created card {} at {}", hex(&new_card.uid), path.display());
    0
}

fn show_card(card: Option<PathBuf>, config: Option<PathBuf>) -> i32 {
    let Some(config) = load_config(config) else {
        return 1;
    };
    let path = card.unwrap_or_else(config::default_card_path);
    let card = match SimulatedCard::load(&path) {
        Ok(card) => card,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let balance = card.block(config.balance_block).unwrap_or_default();
    let password = card.block(config.password_block).unwrap_or_default();
    let stored = ledger::decode(&balance);

    println!("Card file:       {}", path.display());
    println!("UID:             {}", hex(&card.uid));
    println!("Key A:           {}", hex(&card.key_a));
    println!("Key B:           {}", hex(&card.key_b));
    println!("Balance block:   {} ({})", config.balance_block, hex(&balance));
    println!("Stored balance:  {}", stored);
    println!("  literal:       {} $", stored);
    println!("  consistent:    {} $", stored / SCALE);
    println!("Password block:  {} ({})", config.password_block, hex(&password));
    println!("Password:        {}", printable(&password));
    0
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect()
}
