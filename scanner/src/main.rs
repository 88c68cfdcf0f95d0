use clap::Parser;
use log::{info, warn};
use scanner::{ScannerConfig, ServerScanner};
use std::net::Ipv4Addr;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Game protocol version servers must advertise
    #[arg(short = 'v', long, default_value = "1")]
    version_number: u32,

    /// Discovery port game servers listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_SERVER_PORT)]
    port: u16,

    /// Address discovery probes are sent to
    #[arg(short, long, default_value = "255.255.255.255")]
    broadcast: Ipv4Addr,

    /// Master server listing URL to poll
    #[arg(short, long)]
    master: Option<String>,

    /// Skip local network discovery
    #[arg(long)]
    no_lan: bool,

    /// Ticks per second
    #[arg(short, long, default_value = "20")]
    tick_rate: u32,

    /// Stop after this many seconds (runs until Ctrl+C otherwise)
    #[arg(short, long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut config = ScannerConfig::new(args.version_number, args.port);
    config.broadcast_addr = args.broadcast;

    let mut scanner = ServerScanner::with_config(config);
    scanner.add_callbacks(
        |address, name| println!("+ {} ({})", address, name),
        |address| println!("- {}", address),
    );

    if !args.no_lan {
        scanner.scan_local_network()?;
    }
    if let Some(url) = &args.master {
        info!("Polling master server at {}", url);
        scanner.scan_master_server(url)?;
    }
    if args.no_lan && args.master.is_none() {
        warn!("Both discovery channels are disabled; nothing will be found");
    }

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    tokio::select! {
        _ = run_scan_loop(&mut scanner, args.tick_rate.max(1), deadline) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    let servers = scanner.server_list();
    println!("{} server(s) listed:", servers.len());
    for server in servers {
        println!("  {:<24} {}", server.socket_addr(), server.name);
    }

    Ok(())
}

/// Drives the scanner the way a game's frame loop would
async fn run_scan_loop(scanner: &mut ServerScanner, tick_rate: u32, deadline: Option<Instant>) {
    let mut tick_interval = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_update = Instant::now();

    loop {
        tick_interval.tick().await;

        let now = Instant::now();
        let delta_time = (now - last_update).as_secs_f32();
        last_update = now;

        scanner.update(delta_time);

        if deadline.is_some_and(|deadline| now >= deadline) {
            break;
        }
    }
}
