//! CLI entry point for the incident process chain engine.
//!
//! Designed for subprocess invocation: reads a JSON request from stdin,
//! writes the resulting `IncidentProcessChain` to stdout.

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use chain_core::chain::IncidentProcessChain;
use chain_core::config::ChainConfig;
use chain_core::types::IpMappingRelation;
use chain_graph::bridge::{NetworkEdge, NetworkNode};
use chain_graph::{BuildDiagnostics, IncidentChainEngine, NetworkBridgeInput};
use chain_query::{QueryClient, QueryServiceConfig};

#[derive(Parser)]
#[command(name = "chain-cli")]
#[command(about = "Incident process chain reconstruction engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: chain).
    #[arg(short, long, default_value = "chain", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Build an incident process chain from a JSON request on stdin.
    Build,
    /// Run election, build, and analysis only, reporting shape and
    /// cycle counts without extraction/pruning/injection/bridging.
    Validate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest {
    ip_mapping: IpMappingRelation,
    #[serde(default)]
    start_log_event_ids: HashMap<String, Vec<String>>,
    #[serde(default)]
    network: Option<NetworkBridgeRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkBridgeRequest {
    nodes: Vec<NetworkNode>,
    edges: Vec<NetworkEdge>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    ip_mapping: IpMappingRelation,
    #[serde(default)]
    start_log_event_ids: HashMap<String, Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildResponse {
    #[serde(flatten)]
    chain: IncidentProcessChain,
    diagnostics: BuildDiagnostics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let chain_config = ChainConfig::load(&cli.config).unwrap_or_default();
    let query_config = load_query_config(&cli.config);
    let client = QueryClient::http(&query_config)?;
    let engine = IncidentChainEngine::new(&client, &chain_config);

    match cli.command {
        Command::Build => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: BuildRequest = serde_json::from_str(&input)?;
            let network = request.network.map(|n| NetworkBridgeInput { nodes: n.nodes, edges: n.edges });

            let (chain, diagnostics) = engine
                .build(&request.ip_mapping, &request.start_log_event_ids, network.as_ref())
                .await;
            println!("{}", serde_json::to_string(&BuildResponse { chain, diagnostics })?);
        }
        Command::Validate => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: ValidateRequest = serde_json::from_str(&input)?;

            let diagnostics = engine
                .validate(&request.ip_mapping, &request.start_log_event_ids)
                .await;
            println!("{}", serde_json::to_string(&diagnostics)?);
        }
    }

    Ok(())
}

fn load_query_config(file_prefix: &str) -> QueryServiceConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("CHAIN")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    match cfg {
        Ok(c) => QueryServiceConfig {
            base_url: c
                .get_string("query_service.base_url")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            timeout_secs: c
                .get_int("query_service.timeout_secs")
                .map(|v| v as u64)
                .unwrap_or(30),
        },
        Err(_) => QueryServiceConfig::default(),
    }
}
