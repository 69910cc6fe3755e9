//! REFLEX server binary.
//!
//! Hosts the inbound handler on a TCP listener: the core never listens by
//! itself, this binary owns the socket, the dispatcher, and the logging.
//!
//! Usage: reflex-server [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to JSON configuration file
//!   -g, --generate       Print a starter configuration
//!   -h, --help           Print help information

use std::env;
use std::sync::Arc;

use reflex::config::ServerConfig;
use reflex::dispatch::{Dispatcher, TcpDispatcher};
use reflex::Handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Respects RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "-g" | "--generate" => {
            generate_config()?;
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                return Ok(());
            }
            run_server(&args[2]).await?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"reflex-server - traffic-obfuscating proxy inbound

USAGE:
    reflex-server [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to JSON configuration file
    -g, --generate          Print a starter configuration
    -h, --help              Print help information

EXAMPLES:
    Generate a starter configuration:
        reflex-server --generate > reflex.json

    Run the server:
        reflex-server --config reflex.json
"#
    );
}

fn generate_config() -> anyhow::Result<()> {
    use reflex::config::{ClientConfig, FallbackConfig, InboundConfig};

    let config = ServerConfig {
        listen_addr: "0.0.0.0".to_string(),
        listen_port: 8443,
        inbound: InboundConfig {
            clients: vec![ClientConfig {
                id: uuid::Uuid::new_v4().to_string(),
                policy: Some("mimic-http2-api".to_string()),
            }],
            fallback: Some(FallbackConfig { dest: 8080 }),
            profile: None,
        },
    };

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run_server(config_path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(config_path)?;
    let config: ServerConfig = serde_json::from_str(&raw)?;

    let handler = Arc::new(Handler::new(config.inbound)?);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(TcpDispatcher);

    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("reflex inbound listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let handler = Arc::clone(&handler);
                let dispatcher = Arc::clone(&dispatcher);

                tokio::spawn(async move {
                    stream.set_nodelay(true).ok();
                    if let Err(e) = handler.process(stream, Some(dispatcher)).await {
                        tracing::debug!("connection from {} ended: {}", peer_addr, e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("accept error: {}", e);
            }
        }
    }
}
