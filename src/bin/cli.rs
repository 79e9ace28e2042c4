//! hlld CLI Client
//!
//! Command-line interface for interacting with an hlld server.

use clap::{Parser, Subcommand};
use hlld_client::{Client, Config, CreateOptions, ServerAddr, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// hlld CLI
#[derive(Parser, Debug)]
#[command(name = "hlld-cli")]
#[command(about = "CLI for the hlld set-cardinality server")]
#[command(version)]
struct Args {
    /// Server address (host or host:port)
    #[arg(short, long, default_value = "127.0.0.1:4553")]
    server: String,

    /// Connect/read/write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a set
    Create {
        name: String,

        /// HyperLogLog precision
        #[arg(long, conflicts_with = "eps")]
        precision: Option<u8>,

        /// Upper bound on variance
        #[arg(long)]
        eps: Option<f64>,

        /// Keep the set in memory only
        #[arg(long)]
        in_memory: bool,
    },

    /// Permanently delete a set
    Drop { name: String },

    /// Unload a set from server memory
    Close { name: String },

    /// Remove a closed set from the set list
    Clear { name: String },

    /// Add one or more keys to a set
    Add {
        name: String,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Check one or more keys against a set
    Check {
        name: String,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Show a set's info block
    Info { name: String },

    /// List sets
    List {
        /// Only list sets whose names start with this prefix
        prefix: Option<String>,
    },

    /// Flush one set, or all sets, to disk
    Flush { name: Option<String> },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> hlld_client::Result<()> {
    let addr: ServerAddr = args.server.parse()?;
    tracing::debug!("Using server {}", addr);

    let config = Config::builder()
        .addr(addr)
        .connect_timeout_ms(args.timeout_ms)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();
    let client = Client::with_config(config);

    match args.command {
        Commands::Create {
            name,
            precision,
            eps,
            in_memory,
        } => {
            let mut options = CreateOptions::default().in_memory(in_memory);
            options.precision = precision;
            options.eps = eps;
            client.create_set(&name, &options)?;
            println!("Done");
        }
        Commands::Drop { name } => {
            client.drop_set(&name)?;
            println!("Done");
        }
        Commands::Close { name } => {
            client.set(&name).close()?;
            println!("Done");
        }
        Commands::Clear { name } => {
            client.set(&name).clear()?;
            println!("Done");
        }
        Commands::Add { name, keys } => {
            let set = client.set(&name);
            if let [key] = keys.as_slice() {
                set.add(key)?;
                println!("Done");
            } else {
                print_flags(&keys, &set.bulk_add(keys.as_slice())?);
            }
        }
        Commands::Check { name, keys } => {
            let set = client.set(&name);
            if let [key] = keys.as_slice() {
                println!("{}", yes_no(set.check(key)?));
            } else {
                print_flags(&keys, &set.bulk_check(keys.as_slice())?);
            }
        }
        Commands::Info { name } => {
            for (key, value) in client.set(&name).info()? {
                println!("{} {}", key, value);
            }
        }
        Commands::List { prefix } => {
            let names = match prefix {
                Some(prefix) => client.list_sets_with_prefix(&prefix)?,
                None => client.list_sets()?,
            };
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Flush { name } => {
            match client.execute(hlld_client::Command::flush(name.as_deref()))? {
                Value::Unit => println!("Done"),
                other => println!("{:?}", other),
            }
        }
    }

    client.close();
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn print_flags(keys: &[String], flags: &[bool]) {
    for (key, flag) in keys.iter().zip(flags) {
        println!("{} {}", key, yes_no(*flag));
    }
}
