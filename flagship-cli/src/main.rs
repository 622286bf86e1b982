mod credentials;
mod render;
mod serve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use flagship_lib::{Defaults, Flagship, Layer};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use credentials::Credentials;

#[derive(Parser, Debug)]
#[command(name = "flagship")]
#[command(version)]
#[command(about = "Inspect feature flags served by a Flagship backend", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Args, Debug)]
struct Connection {
    /// Application key (overrides saved credentials)
    #[arg(short = 'k', long = "app-key", env = "FLAGSHIP_APP_KEY")]
    app_key: Option<String>,

    /// Backend base URL (overrides saved credentials)
    #[arg(short = 'u', long = "base-url", env = "FLAGSHIP_BASE_URL")]
    base_url: Option<String>,

    /// Path to config file
    #[arg(short = 'c', long = "config", default_value = "flagship.toml")]
    config: String,

    /// Directory of the on-disk flag cache
    #[arg(long = "cache-dir", default_value = ".flagship-cache")]
    cache_dir: String,

    /// Default used when neither the backend nor the cache knows a flag
    /// (e.g. -D dark_mode=false -D limit=20)
    #[arg(short = 'D', long = "default", value_name = "KEY=VALUE")]
    defaults: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Kind {
    Bool,
    String,
    Number,
    Int,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and save credentials
    Login {
        #[arg(short = 'k', long = "app-key")]
        app_key: String,

        #[arg(short = 'u', long = "base-url")]
        base_url: String,

        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "flagship.toml")]
        config: String,
    },
    /// Remove saved credentials
    Logout {
        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "flagship.toml")]
        config: String,
    },
    /// Fetch and list all flags
    List {
        #[command(flatten)]
        connection: Connection,

        /// Show flag descriptions
        #[arg(short = 'd', long = "description")]
        description: bool,
    },
    /// Fetch flags and resolve a single one through a typed accessor
    Get {
        #[command(flatten)]
        connection: Connection,

        /// Flag key
        key: String,

        #[arg(long = "kind", value_enum, default_value_t = Kind::Bool)]
        kind: Kind,

        /// Value returned when the flag cannot be resolved
        #[arg(long = "fallback")]
        fallback: Option<String>,
    },
    /// Serve flags from a JSON file for local testing
    Serve {
        /// Path to a JSON array of flags
        #[arg(short = 'f', long = "file", default_value = "flags.json")]
        file: String,

        /// Port to listen on
        #[arg(short = 'p', long = "port", default_value_t = 8080)]
        port: u16,

        /// Only answer this application key
        #[arg(short = 'k', long = "app-key")]
        app_key: Option<String>,
    },
}

/// Parse a `key=value` default. The value is read as JSON when possible,
/// otherwise kept as a plain string.
fn parse_default(pair: &str) -> Option<(String, Value)> {
    let (key, raw) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
    Some((key.to_string(), value))
}

fn parse_defaults(pairs: &[String]) -> Defaults {
    let mut defaults = Defaults::new();
    for pair in pairs {
        match parse_default(pair) {
            Some((key, value)) => defaults.insert(key, value),
            None => {
                eprintln!("Invalid default '{}', expected KEY=VALUE", pair);
                process::exit(1);
            }
        }
    }
    defaults
}

fn connect(connection: &Connection) -> Flagship {
    let saved = credentials::load(&connection.config);
    let resolved = match credentials::resolve(
        connection.app_key.as_deref(),
        connection.base_url.as_deref(),
        &saved,
    ) {
        Some(r) => r,
        None => {
            eprintln!("No credentials. Run `flagship login`, pass --app-key/--base-url, or set FLAGSHIP_APP_KEY/FLAGSHIP_BASE_URL");
            process::exit(1);
        }
    };

    flagship_lib::init(&resolved.app_key, &resolved.base_url)
        .auto_load(false)
        .cache_path(&connection.cache_dir)
        .defaults(parse_defaults(&connection.defaults))
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Init failed: {}", e);
            process::exit(1);
        })
}

fn report_fallback(client: &Flagship) {
    if let Some(report) = client.last_report() {
        if report.served_from != Layer::Remote {
            eprintln!(
                "Backend unavailable after {} attempts, served from {}",
                report.attempts, report.served_from
            );
        }
    }
}

async fn run_login(app_key: &str, base_url: &str, config_path: &str) {
    let app_key = app_key.trim();
    let base_url = base_url.trim();

    // Initialize without loading, only to validate the arguments
    match flagship_lib::init(app_key, base_url).auto_load(false).build() {
        Ok(client) => client.shutdown().await,
        Err(e) => {
            eprintln!("Init failed: {}", e);
            process::exit(1);
        }
    }

    let creds = Credentials {
        app_key: Some(app_key.to_string()),
        base_url: Some(base_url.to_string()),
    };
    if let Err(e) = credentials::save(config_path, &creds) {
        eprintln!("{}", e);
        process::exit(1);
    }
    println!("✓ Saved credentials for {} to {}", base_url, config_path);
}

fn run_logout(config_path: &str) {
    match credentials::clear(config_path) {
        Ok(true) => println!("Credentials cleared"),
        Ok(false) => println!("No saved credentials in {}", config_path),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

async fn run_list(connection: &Connection, show_description: bool) {
    let client = connect(connection);
    let flags = client.fetch_flags().await;
    report_fallback(&client);

    if flags.is_empty() {
        eprintln!("No flags found (or error)");
    }
    for flag in flags.iter() {
        println!("{}", render::row(flag, show_description));
    }
    client.shutdown().await;
}

fn parse_fallback<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            eprintln!("Invalid fallback '{}'", raw);
            process::exit(1);
        }),
    }
}

async fn run_get(connection: &Connection, key: &str, kind: Kind, fallback: Option<&str>) {
    let client = connect(connection);
    client.fetch_flags().await;
    report_fallback(&client);

    let answer = match kind {
        Kind::Bool => client
            .is_enabled(key, parse_fallback(fallback, false))
            .to_string(),
        Kind::String => client.get_string(key, fallback.unwrap_or("")),
        Kind::Number => client
            .get_number(key, parse_fallback(fallback, 0.0))
            .to_string(),
        Kind::Int => client.get_int(key, parse_fallback(fallback, 0)).to_string(),
        Kind::Json => client.get_json(key, fallback.unwrap_or("{}")),
    };
    println!("{}", answer);
    client.shutdown().await;
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Args::parse();
    match cli.cmd {
        Command::Login {
            app_key,
            base_url,
            config,
        } => run_login(&app_key, &base_url, &config).await,
        Command::Logout { config } => run_logout(&config),
        Command::List {
            connection,
            description,
        } => run_list(&connection, description).await,
        Command::Get {
            connection,
            key,
            kind,
            fallback,
        } => run_get(&connection, &key, kind, fallback.as_deref()).await,
        Command::Serve {
            file,
            port,
            app_key,
        } => serve::run_serve(&file, port, app_key).await,
    }
}
