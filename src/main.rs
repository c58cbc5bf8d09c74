// src/main.rs
//
// Endpoint agent entry point. Wires the configuration into the three
// long-lived halves of the process: the report scheduler, the command
// dispatcher (driven by the scheduler's poll timer), and the persistent
// WebSocket channel.
mod channel;
mod collectors;
mod config;
mod dispatcher;
mod models;
mod scanner;
mod scheduler;
mod session;
mod transport;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::sync::Mutex;

use channel::ChannelManager;
use collectors::CollectorSet;
use config::AgentConfig;
use dispatcher::CommandDispatcher;
use models::agent::AgentIdentity;
use scanner::TcpConnectScanner;
use scheduler::ReportScheduler;
use session::capture::PrimaryScreen;
use session::input::EnigoInjector;
use session::SessionManager;
use transport::Transport;

#[derive(Parser, Debug)]
#[command(name = "itsm_agent", about = "Remote-managed endpoint agent")]
struct Args {
    /// Path to the agent configuration file.
    #[arg(short, long, default_value = "agent.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match AgentConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("cannot load configuration: {}", e);
            process::exit(1);
        }
    };

    let identity = AgentIdentity::detect(config.general.agent_id.clone());
    info!(
        "starting agent {} on {} ({})",
        identity.agent_id, identity.hostname, identity.os
    );

    let transport = match Transport::new(config.endpoints.clone(), identity.agent_id.clone()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("cannot build http client: {}", e);
            process::exit(1);
        }
    };
    let collectors = match CollectorSet::new() {
        Ok(collectors) => Arc::new(collectors),
        Err(e) => {
            error!("cannot build collector set: {}", e);
            process::exit(1);
        }
    };

    let sessions = Arc::new(Mutex::new(SessionManager::new(
        Box::new(PrimaryScreen),
        Box::new(EnigoInjector::new()),
    )));
    let channel = ChannelManager::new(
        config.general.channel_url.clone(),
        identity.clone(),
        sessions,
    );
    tokio::spawn(channel.run());

    let dispatcher = CommandDispatcher::new(
        identity.clone(),
        transport.clone(),
        Arc::new(TcpConnectScanner::default()),
    );
    let scheduler = ReportScheduler::new(
        identity,
        config.heartbeat_interval(),
        config.full_report_interval(),
        config.command_poll_interval(),
        PathBuf::from(&config.general.report_filename),
        transport,
        collectors,
        dispatcher,
    );

    scheduler.run().await;
}
