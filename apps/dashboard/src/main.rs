use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use client_core::{Dashboard, DashboardClient, SendOutcome};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod controller;
mod ui;

use controller::commands::{parse_command, DashboardCommand};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the contact service.
    #[arg(long, env = "DASHBOARD_API_URL", default_value = "http://localhost:5000")]
    server_url: String,
    /// Per-request timeout.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

type SharedDashboard = Arc<Dashboard<DashboardClient>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let client = DashboardClient::new(&args.server_url, Duration::from_secs(args.timeout_secs))?;
    debug!(server_url = %client.base_url(), "dashboard starting");
    let dashboard: SharedDashboard = Arc::new(Dashboard::new(client));

    draw(&dashboard).await;
    // The dashboard records the failure for the next frame.
    let _ = dashboard.refresh().await;
    draw(&dashboard).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sends = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(DashboardCommand::Quit) => break,
                    Ok(DashboardCommand::Help) => println!("{}", ui::HELP),
                    Ok(DashboardCommand::Redraw) => draw(&dashboard).await,
                    Ok(DashboardCommand::Refresh) => {
                        let _ = dashboard.refresh().await;
                        draw(&dashboard).await;
                    }
                    Ok(DashboardCommand::Send(target)) => {
                        let view = dashboard.view().await;
                        match target.resolve(&view.contacts) {
                            Ok(contact_id) => {
                                let dashboard = dashboard.clone();
                                sends.spawn(async move { dashboard.send_intro(&contact_id).await });
                                println!("sending...");
                            }
                            Err(err) => println!("{err}"),
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Some(finished) = sends.join_next() => {
                report(finished);
                draw(&dashboard).await;
            }
        }
    }

    while let Some(finished) = sends.join_next().await {
        report(finished);
    }
    Ok(())
}

async fn draw(dashboard: &SharedDashboard) {
    print!("\n{}", ui::render(&dashboard.view().await));
}

fn report(finished: Result<SendOutcome, tokio::task::JoinError>) {
    match finished {
        Ok(outcome) => debug!(?outcome, "send finished"),
        Err(error) => warn!(%error, "send task aborted"),
    }
}
