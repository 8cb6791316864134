//! kvprobe CLI Client
//!
//! Sends a single command and prints the classified reply.

use clap::{Parser, Subcommand};
use kvprobe::network::Connection;
use kvprobe::protocol::{Command, Response, ValueType};
use kvprobe::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// kvprobe CLI
#[derive(Parser, Debug)]
#[command(name = "kvprobe-cli")]
#[command(about = "Send one command to a RESP key-value server")]
struct Args {
    /// Server host
    #[arg(long, default_value = kvprobe::config::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = kvprobe::config::DEFAULT_PORT)]
    port: u16,

    /// Connect/read/write timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

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

    /// Store a typed value
    Put {
        /// Value type tag (string, int, bool, list)
        #[arg(short = 'T', long = "type", default_value = "string")]
        value_type: ValueType,

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

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Get { key } => Command::get(key),
            Commands::Put {
                value_type,
                key,
                value,
            } => Command::put(value_type, key, value),
            Commands::Del { key } => Command::delete(key),
            Commands::Ping => Command::ping(),
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = match Config::builder()
        .host(&args.host)
        .port(args.port)
        .sessions(1)
        .io_timeout_ms(args.timeout_ms)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let command = args.command.into_command();
    let response = Connection::connect(&config).and_then(|mut conn| conn.round_trip(&command));

    match response {
        Ok(response) => {
            println!("{}", response);
            if matches!(response, Response::Error(_)) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} ({})", e, e.kind());
            std::process::exit(1);
        }
    }
}
