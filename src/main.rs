//! chatgate - command admission for chat automation bots.
//!
//! Reads events from stdin, one per line as `actor<TAB>scope<TAB>text` with
//! scope written `group:<id>` or `direct:<id>`, and prints each outcome as a
//! JSON line. A chat transport can sit on either side of the pipe.

use chatgate::clock::SystemClock;
use chatgate::config::{Config, validation};
use chatgate::db::Database;
use chatgate::services::{builtin, spawn_maintenance_task};
use chatgate::types::{Actor, Scope};
use chatgate::{Gate, metrics};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    init_tracing(config.bot.json_logs);

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        name = %config.bot.name,
        master = %config.bot.master,
        prefix = %config.bot.command_prefix,
        "Starting chatgate"
    );

    let db = Database::new(&config.database.path).await?;

    metrics::init();

    let gate = Gate::new(
        &config,
        Arc::new(db),
        Arc::new(SystemClock),
        builtin::descriptors(),
    )?;
    let dispatcher = gate.dispatcher(builtin::bodies(&gate));
    if let Some(port) = config.metrics.port {
        tokio::spawn(chatgate::http::run_http_server(port, gate.status_source()));
    }
    let sweeper = spawn_maintenance_task(gate.sweeper(), config.cache.sweep_interval());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let (Some(actor), Some(scope), Some(text)) = (fields.next(), fields.next(), fields.next())
        else {
            warn!(line = %line, "Expected actor<TAB>scope<TAB>text");
            continue;
        };
        let scope: Scope = match scope.parse() {
            Ok(scope) => scope,
            Err(e) => {
                warn!(error = %e, "Bad scope");
                continue;
            }
        };

        let outcome = dispatcher.on_message(&Actor::new(actor), &scope, text).await;
        let mut json = serde_json::to_string(&outcome)?;
        json.push('\n');
        stdout.write_all(json.as_bytes()).await?;
        stdout.flush().await?;
    }

    sweeper.abort();
    info!("Shutting down");
    Ok(())
}
