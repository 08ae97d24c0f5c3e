use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use odoorpc_api::{ClientOptions, OdooClient};
use odoorpc_types::QueryOptions;
use odoorpc_util::keystore::{DEFAULT_KEYCHAIN_SERVICE, store_backend};
use serde_json::{Value, json};
use tracing::debug;

/// Talk to an Odoo server over JSON-RPC.
#[derive(Parser, Debug)]
#[command(name = "odoorpc", version, about)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

/// Connection flags. Anything left unset falls back to the `ODOO_*` environment.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// Server host, optionally with a scheme
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    port: Option<u16>,

    /// Use https when the host has no scheme
    #[arg(long, global = true)]
    https: bool,

    /// Database name for multi-tenant servers
    #[arg(long, global = true)]
    database: Option<String>,

    /// Credential store key of the session
    #[arg(long, global = true)]
    token_key: Option<String>,

    /// Credential store key of the login payload
    #[arg(long, global = true)]
    data_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange a login and password for a session
    Login {
        login: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session's user
    Whoami,
    /// Run a query given as JSON, or as @path to a JSON file
    Query { options: String },
    /// Long-poll the bus
    Poll {
        #[arg(long = "channel")]
        channels: Vec<String>,
        #[arg(long, default_value_t = 0)]
        last: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let Cli { connection, command } = Cli::parse();

    let options = connection.into_options()?;
    let store = store_backend().build(DEFAULT_KEYCHAIN_SERVICE);
    let client = OdooClient::new(&options, store).context("could not create the Odoo client")?;
    debug!(base_url = %client.transport().base_url(), "client ready");

    run_command(&client, command).await
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run_command(client: &OdooClient, command: Command) -> Result<()> {
    match command {
        Command::Login { login, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let payload = client.login(&login, &password).await.context("login failed")?;
            print_json(&json!({ "uid": payload.uid, "database": payload.database }))
        }
        Command::Logout => {
            client.logout().await.context("logout failed")?;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            client.check_logged_user().await?;
            let user = client.user_data().await.context("could not read the stored login payload")?;
            print_json(&user.unwrap_or_else(|| json!({ "logged_in": true })))
        }
        Command::Query { options } => {
            let options = parse_query_options(&options)?;
            let result = client.query(&options).await.context("query failed")?;
            print_json(&result)
        }
        Command::Poll { channels, last } => {
            let result = if channels.is_empty() && last == 0 {
                client.poll_default().await
            } else {
                client.poll(channels, last).await
            };
            print_json(&result.context("poll failed")?)
        }
    }
}

impl ConnectionArgs {
    fn into_options(self) -> Result<ClientOptions> {
        let mut options = ClientOptions::from_env()?;
        if let Some(host) = self.host {
            options.host = host;
        }
        if let Some(port) = self.port {
            options.port = Some(port);
        }
        if self.https {
            options.https = true;
        }
        if let Some(database) = self.database {
            options.database = Some(database);
        }
        if let Some(token_key) = self.token_key {
            options.token_key = token_key;
        }
        if let Some(data_key) = self.data_key {
            options.data_key = Some(data_key);
        }
        Ok(options)
    }
}

/// Parse query options from inline JSON or from `@path`.
fn parse_query_options(raw: &str) -> Result<QueryOptions> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path)).with_context(|| format!("could not read query file '{path}'"))?,
        None => raw.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("query options must be valid JSON")?;
    if !value.is_object() {
        bail!("query options must be a JSON object");
    }
    serde_json::from_value(value).context("invalid query options")
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("could not read the password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
