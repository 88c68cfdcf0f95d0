use clap::Parser;
use log::info;
use server::network::{Responder, ResponderConfig};

/// Answers LAN discovery probes on behalf of a game server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// IP address to listen for probes on
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Discovery port to listen for probes on
        #[clap(short, long, default_value_t = shared::DEFAULT_SERVER_PORT)]
        port: u16,
        /// Game port advertised to scanners
        #[clap(short, long, default_value = "7777")]
        game_port: u16,
        /// Server name advertised to scanners
        #[clap(short, long, default_value = "Game Server")]
        name: String,
        /// Protocol version to answer probes for
        #[clap(short = 'v', long, default_value = "1")]
        version_number: u32,
    }

    env_logger::init();

    let args = Args::parse();

    let config = ResponderConfig::new(args.version_number, args.game_port, &args.name);
    let address = format!("{}:{}", args.host, args.port);
    let responder = Responder::bind(&address, config).await?;

    tokio::select! {
        result = responder.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
