//! RQLDB - An In-Memory Key-Value Database with a Statement Language
//!
//! This is the main entry point for the RQLDB server.
//! It sets up the stores, seeds the admin user, and handles incoming
//! connections.

use anyhow::{bail, Context};
use bytes::Bytes;
use rqldb::connection::{handle_connection, ConnectionStats};
use rqldb::security::{register_user, AccessLevel, RegisteredUser, Session};
use rqldb::storage::{start_expiry_sweeper, Expiry, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--user` is not given
const USER_ENV: &str = "RQLDB_USER";

/// Environment variable consulted when `--password` is not given
const PASSWORD_ENV: &str = "RQLDB_PASSWORD";

/// Server configuration
#[derive(Debug, PartialEq)]
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Username of the bootstrap admin
    user: String,
    /// Password of the bootstrap admin
    password: Option<String>,
    /// Expiry applied to `SET` without a TTL
    default_expiry: Expiry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: rqldb::DEFAULT_HOST.to_string(),
            port: rqldb::DEFAULT_PORT,
            user: "admin".to_string(),
            password: None,
            default_expiry: Expiry::Never,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments, falling back to the
    /// environment for credentials.
    fn from_args() -> anyhow::Result<Self> {
        Self::parse(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    fn parse<I, E>(args: I, env: E) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let mut user = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().context("--host requires a value")?;
                }
                "--port" | "-p" => {
                    let value = args.next().context("--port requires a value")?;
                    config.port = value
                        .parse()
                        .with_context(|| format!("invalid port number '{}'", value))?;
                }
                "--user" | "-u" => {
                    user = Some(args.next().context("--user requires a value")?);
                }
                "--password" => {
                    config.password = Some(args.next().context("--password requires a value")?);
                }
                "--default-ttl" => {
                    let value = args.next().context("--default-ttl requires a value")?;
                    let ms: u64 = value
                        .parse()
                        .with_context(|| format!("invalid default TTL '{}'", value))?;
                    if ms == 0 {
                        bail!("--default-ttl must be greater than zero");
                    }
                    config.default_expiry = Expiry::from_millis(ms);
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("RQLDB version {}", rqldb::VERSION);
                    std::process::exit(0);
                }
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        if let Some(user) = user.or_else(|| env(USER_ENV)) {
            config.user = user;
        }
        if config.password.is_none() {
            config.password = env(PASSWORD_ENV);
        }
        if config.user.is_empty() {
            bail!("admin username must not be empty");
        }

        Ok(config)
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
RQLDB - An In-Memory Key-Value Database with a Statement Language

USAGE:
    rqldb [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 5678)
    -u, --user <USER>          Admin username (env: RQLDB_USER, default: admin)
        --password <PASS>      Admin password (env: RQLDB_PASSWORD, required)
        --default-ttl <MS>     Expire keys set without a TTL after MS milliseconds
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    rqldb --password s3cret                  # Start on 127.0.0.1:5678
    RQLDB_PASSWORD=s3cret rqldb -p 5679      # Start on port 5679

CONNECTING:
    Send one request per line; each statement ends with ';':
    $ nc 127.0.0.1 5678
    AUTH admin s3cret;
    Successfully authenticated
    SET name "widget" 60000; GET name other;
    Success
    ["widget", (nil)]
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
RQLDB v{} - In-Memory Key-Value Database
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        rqldb::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args()?;

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let password = match &config.password {
        Some(password) => password.clone(),
        None => bail!(
            "no admin password given; pass --password or set {}",
            PASSWORD_ENV
        ),
    };

    // Create the stores (shared across all connections)
    let data: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::new(config.default_expiry));
    let users: Arc<StorageEngine<RegisteredUser>> = Arc::new(StorageEngine::new(Expiry::Never));
    info!(default_expiry = ?config.default_expiry, "Storage engines initialized with 64 shards");

    register_user(&users, &config.user, &password, AccessLevel::Admin);
    info!(user = %config.user, "Admin user registered");

    // Start the background expiry sweeper
    let sweeper = start_expiry_sweeper("data", Arc::clone(&data));

    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    print_banner(&config);
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, data, users, Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    sweeper.stop();
    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    data: Arc<StorageEngine<Bytes>>,
    users: Arc<StorageEngine<RegisteredUser>>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                // Each connection gets a fresh, unauthenticated session
                let session = Session::new(Arc::clone(&data), Arc::clone(&users));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, session, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
