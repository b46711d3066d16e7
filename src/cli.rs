use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};
use tracing::{debug, info, warn};

use kismet_client::{ClientError, Config, KismetClient, Network, PollEvent};

#[derive(Parser)]
#[command(name = "kismet-client")]
#[command(author, version, about = "Client for the Kismet wireless telemetry protocol")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Server host (overrides the configuration file)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Server port (overrides the configuration file)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the server and print status lines as they arrive
    Watch {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Collect for a while, then list the networks seen
    Networks {
        /// Only show the N most recently active networks
        #[arg(short, long)]
        recent: Option<usize>,

        /// Seconds to collect before printing
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Output format (table, json, simple)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Send one raw line to the server
    Send {
        /// Line to send; a newline is appended
        line: String,
    },

    /// Generate default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Table row for network list
#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "BSSID")]
    bssid: String,
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Type")]
    net_type: String,
    #[tabled(rename = "Ch")]
    channel: i32,
    #[tabled(rename = "WEP")]
    wep: String,
    #[tabled(rename = "Clients")]
    clients: usize,
    #[tabled(rename = "Signal")]
    signal: i32,
    #[tabled(rename = "First Seen")]
    first_seen: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl NetworkRow {
    fn from_network(net: &Network) -> Self {
        Self {
            bssid: net.bssid.to_string(),
            ssid: net.ssid.clone().unwrap_or_else(|| "<no ssid>".to_string()),
            net_type: net.net_type.to_string(),
            channel: net.channel,
            wep: if net.wep { "yes" } else { "no" }.to_string(),
            clients: net.clients.len(),
            signal: net.signal.signal,
            first_seen: format_time(net.first_time),
            last_seen: format_time(net.last_time),
        }
    }
}

fn format_time(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn run_command(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    debug!(
        "Server {}:{}, poll every {:?}, limits {:?}",
        config.server.host,
        config.server.port,
        config.poll_interval(),
        config.limits()
    );

    match cli.command {
        Commands::Watch { seconds } => cmd_watch(config, seconds),
        Commands::Networks {
            recent,
            seconds,
            format,
        } => cmd_networks(config, recent, seconds, format),
        Commands::Send { line } => cmd_send(config, line),
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

fn connect(config: &Config) -> Result<KismetClient> {
    KismetClient::connect(&config.server.host, config.server.port, config.limits())
        .with_context(|| format!("Failed to connect to {}:{}", config.server.host, config.server.port))
}

fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to register Ctrl-C handler")?;
    Ok(shutdown)
}

/// Poll until `deadline` or shutdown, sleeping only when idle.
///
/// A server-side close ends the loop quietly; any other failure is returned.
fn run_session<F>(
    client: &mut KismetClient,
    interval: Duration,
    deadline: Option<Instant>,
    shutdown: &AtomicBool,
    mut on_event: F,
) -> Result<()>
where
    F: FnMut(&KismetClient, PollEvent),
{
    while !shutdown.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match client.poll() {
            Ok(PollEvent::Idle) => thread::sleep(interval),
            Ok(event) => on_event(&*client, event),
            Err(e) if e.is_terminal() => {
                warn!("{}", e);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn cmd_watch(config: Config, seconds: Option<u64>) -> Result<()> {
    let shutdown = shutdown_flag()?;
    let mut client = connect(&config)?;
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let mut strings_seen = 0u64;

    run_session(&mut client, config.poll_interval(), deadline, &shutdown, |client, event| {
        let store = client.store();
        if event == PollEvent::StatusChanged {
            println!("{} {}", "STATUS".green().bold(), store.status());
        }
        let total = store.strings_received();
        if total != strings_seen {
            if let Some(line) = store.strings().last() {
                println!("{} {}", "STRING".cyan(), line);
            }
            strings_seen = total;
        }
    })?;

    let store = client.store();
    let stats = client.dispatch_stats();
    info!(
        "Session summary: {} networks, {} packets, {} lines ({} malformed)",
        store.network_count(),
        store.packets_received(),
        stats.lines,
        stats.malformed
    );
    if store.version().major != 0 {
        println!("Server version {}", store.version().to_string().bold());
    }
    Ok(())
}

fn cmd_networks(config: Config, recent: Option<usize>, seconds: u64, format: String) -> Result<()> {
    let shutdown = shutdown_flag()?;
    let mut client = connect(&config)?;
    let deadline = Instant::now() + Duration::from_secs(seconds);

    run_session(&mut client, config.poll_interval(), Some(deadline), &shutdown, |_, _| {})?;

    let store = client.store();
    let networks = match recent {
        Some(n) => store.most_recent(n),
        None => store.networks(),
    };

    if networks.is_empty() {
        println!("No networks seen");
        return Ok(());
    }

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&networks)?);
        }
        "simple" => {
            for net in &networks {
                println!("{} {}", net.bssid, net.ssid.as_deref().unwrap_or(""));
            }
        }
        _ => {
            let rows: Vec<NetworkRow> = networks.iter().map(|n| NetworkRow::from_network(n)).collect();
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}

fn cmd_send(config: Config, mut line: String) -> Result<()> {
    let mut client = connect(&config)?;
    line.push('\n');
    client.send(&line)?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while client.connection().pending_write() > 0 {
        if Instant::now() >= deadline {
            anyhow::bail!("Timed out sending to {}:{}", config.server.host, config.server.port);
        }
        match client.poll() {
            Ok(PollEvent::Idle) => thread::sleep(config.poll_interval()),
            Ok(_) => {}
            Err(ClientError::EndOfStream) | Err(ClientError::Terminated) => {
                anyhow::bail!("Server closed the connection before the line was sent")
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("{}", "Sent".green());
    client.close();
    Ok(())
}

fn cmd_gen_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();

    match output {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
