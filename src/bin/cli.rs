//! tlogkv CLI Client
//!
//! Command-line interface for a server running the TCP frontend.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tlogkv::network::Client;

/// tlogkv CLI
#[derive(Parser, Debug)]
#[command(name = "tlogkv-cli")]
#[command(about = "CLI for the tlogkv key-value store (TCP frontend)")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cannot connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Get { key } => client.get(&key).map(|value| match value {
            Some(v) => println!("{}", v),
            None => println!("(not found)"),
        }),
        Commands::Set { key, value } => client.put(&key, &value).map(|_| println!("OK")),
        Commands::Del { key } => client.delete(&key).map(|_| println!("OK")),
        Commands::Ping => client.ping().map(|_| println!("PONG")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
