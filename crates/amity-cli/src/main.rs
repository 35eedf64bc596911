//! Amity CLI - Command-line interface for Amity
//!
//! Manages a friend graph stored in a local data directory: users,
//! `knows` relations, and the friend-of-friend queries built on them.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "amity")]
#[command(author = "Amity Contributors")]
#[command(version)]
#[command(about = "A social graph of who knows whom", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory
    #[arg(short, long, global = true, default_value = ".amity")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory
    Init {
        /// Number of graph handles in the pool
        #[arg(long)]
        pool_size: Option<usize>,

        /// Return vertex ids even when the index write fails (compatibility mode)
        #[arg(long)]
        legacy_index_failure: bool,

        /// Drop the stored graph and index
        #[arg(long)]
        reset: bool,
    },

    /// Add a user
    AddUser {
        user: String,
    },

    /// Record that USER knows FRIEND
    AddRelation {
        user: String,
        friend: String,

        /// Also record that FRIEND knows USER
        #[arg(long)]
        mutual: bool,
    },

    /// Remove the relation USER knows FRIEND
    DeleteRelation {
        user: String,
        friend: String,
    },

    /// List the users USER knows directly
    Friends {
        user: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show how far each candidate is from USER (1 or 2 hops)
    Levels {
        user: String,

        #[arg(required = true)]
        candidates: Vec<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Count the common friends USER has with each candidate
    Common {
        user: String,

        #[arg(required = true)]
        candidates: Vec<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show graph and index statistics
    Status,

    /// Export the graph to JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let data = cli.data.as_path();
    let result = match cli.command {
        Commands::Init {
            pool_size,
            legacy_index_failure,
            reset,
        } => commands::init(data, pool_size, legacy_index_failure, reset),
        Commands::AddUser { user } => commands::add_user(data, &user),
        Commands::AddRelation {
            user,
            friend,
            mutual,
        } => commands::add_relation(data, &user, &friend, mutual),
        Commands::DeleteRelation { user, friend } => {
            commands::delete_relation(data, &user, &friend)
        }
        Commands::Friends { user, json } => commands::friends(data, &user, json),
        Commands::Levels {
            user,
            candidates,
            json,
        } => commands::levels(data, &user, &candidates, json),
        Commands::Common {
            user,
            candidates,
            json,
        } => commands::common(data, &user, &candidates, json),
        Commands::Status => commands::status(data),
        Commands::Export { output } => commands::export(data, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
