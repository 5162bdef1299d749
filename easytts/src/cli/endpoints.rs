//! endpoints subcommand
//!
//! Lists configured endpoints and probes their queues.

use super::{build_pool, load_config};
use crate::balancer::select_endpoint;
use crate::types::endpoint::QueueState;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;

/// Arguments for the endpoints subcommand
#[derive(Args, Debug, Clone)]
pub struct EndpointsArgs {
    /// Endpoints subcommand
    #[command(subcommand)]
    pub command: EndpointsCommand,
}

/// Endpoints subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum EndpointsCommand {
    /// Show configured endpoints (tokens masked)
    List,
    /// Probe every endpoint's queue and show the selection order
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct StatusRow<'a> {
    name: &'a str,
    base_url: &'a str,
    queue_size: Option<u32>,
    unreachable: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    endpoints: Vec<StatusRow<'a>>,
    ranking: Vec<crate::balancer::RankedEndpoint<'a>>,
    selected: Option<&'a str>,
}

/// Execute the endpoints command
pub async fn execute(args: &EndpointsArgs, config_path: Option<&Path>) -> Result<(), anyhow::Error> {
    let config = load_config(config_path)?;
    let pool = build_pool(&config)?;

    match &args.command {
        EndpointsCommand::List => {
            println!("NAME\tBASE_URL\tFN_INDEX\tTRIGGER_ID\tTOKEN");
            for ep in &pool.config().endpoints {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    ep.name,
                    ep.base_url,
                    ep.fn_index,
                    ep.trigger_id,
                    ep.masked_token()
                );
            }
        }
        EndpointsCommand::Status { json } => {
            let statuses = pool.statuses().await;
            let report = StatusReport {
                endpoints: statuses
                    .iter()
                    .map(|s| StatusRow {
                        name: s.endpoint.name.as_str(),
                        base_url: s.endpoint.base_url.as_str(),
                        queue_size: s.queue.queue_size(),
                        unreachable: match &s.queue {
                            QueueState::Unreachable(reason) => Some(reason.as_str()),
                            QueueState::Available(_) => None,
                        },
                    })
                    .collect(),
                ranking: pool.rank(&statuses),
                selected: select_endpoint(&statuses).map(|ep| ep.name.as_str()),
            };

            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("NAME\tQUEUE\tSTATUS\tURL");
            for row in &report.endpoints {
                let busy = report
                    .ranking
                    .iter()
                    .any(|r| r.name == row.name && r.busy);
                let (queue, status) = match (row.queue_size, row.unreachable) {
                    (Some(q), _) if busy => (q.to_string(), "BUSY".to_string()),
                    (Some(q), _) => (q.to_string(), "OK".to_string()),
                    (None, reason) => ("-".to_string(), format!("UNREACHABLE ({})", reason.unwrap_or("unknown"))),
                };
                println!("{}\t{}\t{}\t{}", row.name, queue, status, row.base_url);
            }
            match report.selected {
                Some(name) => println!("\nNext request goes to: {name}"),
                None => println!("\nNo endpoint is reachable"),
            }
        }
    }
    Ok(())
}
