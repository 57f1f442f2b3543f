//! oscwire CLI - send and receive Open Sound Control packets
//!
//! Send messages or bundles over UDP, or listen and print what arrives.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oscwire_core::{Bundle, Message, Packet, DEFAULT_PORT, MAX_DATAGRAM_SIZE, TIME_TAG_IMMEDIATE};
use oscwire_server::OscServer;
use oscwire_transport::UdpClient;

mod args;
mod config;

use config::FileConfig;

/// How often `listen` pumps the dispatcher
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// oscwire - Open Sound Control over UDP
#[derive(Parser)]
#[command(name = "oscwire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "OSCWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one or more messages
    Send {
        /// Destination address (default from config, else 127.0.0.1:8000)
        #[arg(short, long)]
        to: Option<SocketAddr>,

        /// Wrap all messages in a single bundle
        #[arg(long)]
        bundle: bool,

        /// Bundle time tag (1 = immediately)
        #[arg(long, default_value_t = TIME_TAG_IMMEDIATE, requires = "bundle")]
        time_tag: u64,

        /// Allow broadcast destinations
        #[arg(long)]
        broadcast: bool,

        /// Address followed by arguments; separate messages with ';'
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Listen and print incoming messages
    Listen {
        /// Bind address (a multicast group joins that group)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Only print messages matching these patterns
        #[arg(short, long)]
        pattern: Vec<String>,

        /// Only accept these senders (port 0 = any port)
        #[arg(short, long)]
        allow: Vec<SocketAddr>,

        /// Receive our own multicast traffic
        #[arg(long)]
        multicast_loopback: bool,

        /// Print one JSON object per message
        #[arg(long)]
        json: bool,
    },

    /// Show version and defaults
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;
    let file = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Send {
            to,
            bundle,
            time_tag,
            broadcast,
            tokens,
        } => run_send(file, to, bundle, time_tag, broadcast, &tokens)?,

        Commands::Listen {
            bind,
            pattern,
            allow,
            multicast_loopback,
            json,
        } => run_listen(file, bind, pattern, allow, multicast_loopback, json)?,

        Commands::Info => print_info(),
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn run_send(
    file: FileConfig,
    to: Option<SocketAddr>,
    bundle: bool,
    time_tag: u64,
    broadcast: bool,
    tokens: &[String],
) -> Result<()> {
    let messages = args::parse_messages(tokens)?;

    let mut config = file.client;
    if let Some(to) = to {
        config.destination = to;
    }
    config.broadcast |= broadcast;
    let destination = config.destination;

    let client = UdpClient::new(config).context("Failed to open UDP socket")?;

    let packets: Vec<Packet> = if bundle {
        let mut b = Bundle::new(time_tag);
        for message in messages {
            b.add_packet(message);
        }
        vec![b.into()]
    } else {
        messages.into_iter().map(Packet::from).collect()
    };

    for packet in &packets {
        client
            .send(packet)
            .with_context(|| format!("Failed to send to {}", destination))?;
        println!(
            "{} {} -> {}",
            "SENT".green().bold(),
            describe(packet),
            destination
        );
    }

    Ok(())
}

fn run_listen(
    file: FileConfig,
    bind: Option<SocketAddr>,
    patterns: Vec<String>,
    allow: Vec<SocketAddr>,
    multicast_loopback: bool,
    json: bool,
) -> Result<()> {
    let mut config = file.server;
    if let Some(bind) = bind {
        config.receiver.endpoint = bind;
    }
    if !allow.is_empty() {
        config.allow_list_enabled = true;
        config.allow_list.extend(allow);
    }
    config.receiver.multicast_loopback |= multicast_loopback;

    let mut server = OscServer::new(config).context("Invalid server configuration")?;

    let print = move |msg: &Message| print_message(msg, json);
    if patterns.is_empty() {
        server.on_message(print);
    } else {
        for pattern in &patterns {
            server
                .bind_path(pattern, print)
                .with_context(|| format!("Invalid pattern {:?}", pattern))?;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let addr = server.listen().context("Failed to start listening")?;
    if !json {
        println!(
            "{} listening on {} (Ctrl-C to stop)",
            "OSC".cyan().bold(),
            addr
        );
    }

    while running.load(Ordering::SeqCst) {
        server.pump();
        thread::sleep(PUMP_INTERVAL);
    }

    info!("Received shutdown signal");
    server.pump();
    server.stop();
    if server.dropped_packets() > 0 {
        eprintln!(
            "{} {} packets dropped on a full queue",
            "WARN".yellow().bold(),
            server.dropped_packets()
        );
    }

    Ok(())
}

fn describe(packet: &Packet) -> String {
    match packet {
        Packet::Message(m) => format_message(m),
        Packet::Bundle(b) => format!(
            "bundle t={} [{} messages]",
            b.time_tag(),
            b.messages().count()
        ),
    }
}

fn format_message(msg: &Message) -> String {
    let mut line = msg.address().to_string();
    for arg in msg.arguments() {
        line.push(' ');
        line.push_str(&args::format_value(arg));
    }
    line
}

fn print_message(msg: &Message, json: bool) {
    if json {
        match serde_json::to_string(msg) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{} {}", "ERROR".red().bold(), e),
        }
    } else {
        println!(
            "{} {}",
            msg.endpoint().to_string().dimmed(),
            format_message(msg)
        );
    }
}

fn print_info() {
    println!("{}", "oscwire - Open Sound Control over UDP".cyan().bold());
    println!();
    println!("Version:        {}", env!("CARGO_PKG_VERSION"));
    println!("Platform:       {}", std::env::consts::OS);
    println!("Default port:   {}", DEFAULT_PORT);
    println!("Max datagram:   {} bytes", MAX_DATAGRAM_SIZE);
    println!();
    println!("{}", "Argument tokens:".green());
    println!("  i:<int32>  h:<int64>  f:<float>  d:<double>  s:<string>");
    println!("  c:<char>   t:<time tag>  b:<hex blob>  r:<rrggbbaa>");
    println!("  T F N I    (true, false, nil, infinitum)");
    println!();
    println!("{}", "Examples:".green());
    println!("  oscwire send --to 127.0.0.1:8000 /synth/1/freq f:440");
    println!("  oscwire send --bundle /a i:1 ';' /b s:x");
    println!("  oscwire listen --bind 0.0.0.0:8000 --pattern '/mixer/*/volume'");
    println!("  oscwire listen --bind 239.0.0.1:9000 --json");
}
