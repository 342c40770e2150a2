use anyhow::Context;
use clap::{Parser, Subcommand};
use outnet_domain::{CliOverrides, QueryOutcome};
use outnet_infrastructure::outside_network::OutsideNetwork;
use outnet_infrastructure::reactor::TokioReactor;
use tracing::{info, warn};

mod bootstrap;
mod query;

#[derive(Parser)]
#[command(name = "outnet")]
#[command(version = "0.1.0")]
#[command(about = "Outgoing DNS query engine with randomised ports and transaction IDs")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Outgoing ports to open per interface and family
    #[arg(long)]
    ports: Option<usize>,

    /// First port of a fixed outgoing port range
    #[arg(long)]
    port_base: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a name against the upstream servers
    Query {
        /// Domain name to look up
        name: String,

        /// Record type
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: String,

        /// Upstream server as ip:port; repeat for several
        #[arg(short = 's', long = "server")]
        servers: Vec<String>,

        /// Seconds to wait for each reply
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Commands::Query {
        name,
        record_type,
        servers,
        timeout,
    } = cli.command;

    let cli_overrides = CliOverrides {
        log_level: cli.log_level,
        num_ports: cli.ports,
        port_base: cli.port_base,
        query_timeout: timeout,
        servers,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting outnet v{}", env!("CARGO_PKG_VERSION"));

    let record_type = query::parse_record_type(&record_type)?;
    let packet = query::build_query(&name, record_type)?;
    let servers = config
        .upstream
        .socket_addrs()
        .map_err(|bad| anyhow::anyhow!("Invalid upstream server '{}'", bad))?;

    let mut network = OutsideNetwork::create(TokioReactor::new(), &config.outgoing)
        .context("Failed to open outgoing ports")?;
    info!(
        udp4 = network.num_udp4(),
        udp6 = network.num_udp6(),
        "Outgoing port pool ready"
    );

    let results = query::run_queries(
        &mut network,
        &packet,
        &servers,
        config.outgoing.query_timeout,
    )
    .await;
    network.destroy();

    let mut answered = false;
    for result in results {
        match (result.outcome, result.reply.as_deref()) {
            (QueryOutcome::Reply, Some(bytes)) => match query::summarize_reply(bytes) {
                Ok(summary) => {
                    answered = true;
                    println!(
                        ";; {} rcode={} answers={}{}",
                        result.server,
                        summary.rcode,
                        summary.answers.len(),
                        if summary.truncated { " (truncated)" } else { "" }
                    );
                    for record in &summary.answers {
                        println!(
                            "{}\t{}\t{}\t{}",
                            record.name(),
                            record.ttl(),
                            record.record_type(),
                            record.data()
                        );
                    }
                }
                Err(e) => warn!(server = %result.server, error = %e, "Unreadable reply"),
            },
            (outcome, _) => println!(";; {} {}", result.server, outcome),
        }
    }

    if !answered {
        anyhow::bail!("No upstream server answered {}", name);
    }

    info!("Done");
    Ok(())
}
