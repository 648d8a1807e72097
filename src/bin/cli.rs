//! Framecast CLI Client
//!
//! Command-line client for the framed message protocol. Connects,
//! sends one request, and prints every reply that arrives within the
//! wait window.

use std::time::Duration;

use clap::{Parser, Subcommand};
use crossbeam::channel::{self, Receiver};
use framecast::{Client, Config, Message};
use tracing_subscriber::{fmt, EnvFilter};

/// Framecast CLI
#[derive(Parser, Debug)]
#[command(name = "framecast-cli")]
#[command(about = "CLI client for the Framecast message server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "9999")]
    port: u16,

    /// Seconds to wait for replies before disconnecting
    #[arg(short, long, default_value = "2")]
    wait: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a ping and wait for the pong
    Ping,

    /// Send an echo request
    Echo {
        /// Content to echo
        content: String,
    },

    /// Broadcast a message to all other connected clients
    Broadcast {
        /// Content to broadcast
        content: String,
    },

    /// Request server statistics
    Stats,

    /// Send a custom-typed message with a JSON object of extra fields
    Send {
        /// Message type tag
        msg_type: String,

        /// Extra fields as a JSON object
        #[arg(default_value = "{}")]
        fields: String,
    },

    /// Send a plain-text payload (no JSON envelope)
    Text {
        /// Text to send
        text: String,
    },

    /// Stay connected and print everything the server sends
    Listen,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .build();

    let (tx, rx) = channel::unbounded::<Message>();
    let mut client = Client::new(config);

    if let Err(e) = client.connect(move |message| {
        let _ = tx.send(message);
    }) {
        eprintln!("Connection failed: {e}");
        eprintln!("Is the server running? Try: framecast-server --host {} --port {}", args.host, args.port);
        std::process::exit(1);
    }

    // The welcome message arrives first on every connection
    if let Ok(welcome) = rx.recv_timeout(Duration::from_secs(2)) {
        print_message(&welcome);
    }

    let result = match &args.command {
        Commands::Ping => client.ping(),
        Commands::Echo { content } => client.echo(content.clone()),
        Commands::Broadcast { content } => client.broadcast(content.clone()),
        Commands::Stats => client.get_stats(),
        Commands::Send { msg_type, fields } => match serde_json::from_str(fields) {
            Ok(fields) => client.send_custom(msg_type, fields),
            Err(e) => {
                eprintln!("Invalid JSON fields: {e}");
                std::process::exit(2);
            }
        },
        Commands::Text { text } => client.send_text(text.clone()),
        Commands::Listen => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Send failed: {e}");
        std::process::exit(1);
    }

    match args.command {
        Commands::Listen => print_replies_forever(&rx),
        _ => print_replies(&rx, Duration::from_secs(args.wait)),
    }

    let _ = client.disconnect();
}

/// Print replies until the wait window closes
fn print_replies(rx: &Receiver<Message>, wait: Duration) {
    let deadline = std::time::Instant::now() + wait;
    while let Some(remaining) = deadline.checked_duration_since(std::time::Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(message) => print_message(&message),
            Err(_) => break,
        }
    }
}

/// Print replies until the server goes away
fn print_replies_forever(rx: &Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        print_message(&message);
    }
}

fn print_message(message: &Message) {
    match message {
        Message::RawText(text) => println!("[text] {text}"),
        structured => match serde_json::to_string_pretty(&structured.to_value()) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{structured:?}"),
        },
    }
}
