use std::sync::Arc;

use clap::Parser;
use fireprox::config::{Command, ProxyOptions};
use fireprox::manager::GatewayProxyManager;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about = "Provision rotatable pass-through proxies on AWS API Gateway")]
struct Args {
    /// AWS Access Key
    #[arg(long = "access_key", default_value = "")]
    access_key: String,

    /// AWS Secret Access Key
    #[arg(long = "secret_access_key", default_value = "")]
    secret_access_key: String,

    /// AWS Session Token
    #[arg(long = "session_token", default_value = "")]
    session_token: String,

    /// AWS profile section to use
    #[arg(long = "profile", default_value = "")]
    profile: String,

    /// AWS region
    #[arg(long = "region", default_value = "")]
    region: String,

    /// Operation to run
    #[arg(long = "command", value_enum)]
    command: Command,

    /// Endpoint ID (required for delete/update)
    #[arg(
        long = "api_id",
        required_if_eq_any([("command", "delete"), ("command", "update")])
    )]
    api_id: Option<String>,

    /// Backend URL end-point (required for create/update)
    #[arg(
        long = "url",
        required_if_eq_any([("command", "create"), ("command", "update")])
    )]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fireprox=info".parse().expect("valid log directive")),
        )
        .init();

    let args = Args::parse();
    let options = ProxyOptions {
        access_key: args.access_key,
        secret_access_key: args.secret_access_key,
        session_token: args.session_token,
        profile: args.profile,
        region: args.region,
        api_id: args.api_id.unwrap_or_default(),
        url: args.url.unwrap_or_default(),
    };

    // Fatal configuration errors (invalid region, no credentials) stop here.
    let manager = match GatewayProxyManager::new(&options) {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    spawn_interrupt_cleanup(Arc::clone(&manager));

    match args.command {
        Command::List => {
            if let Err(e) = manager.list().await {
                error!(error = %e, "Failed to list APIs");
                std::process::exit(1);
            }
        }
        Command::Create => {
            manager.create(&options.url).await?;
        }
        Command::Delete => {
            let successful = manager.delete(&options.api_id).await;
            let outcome = if successful { "Success!" } else { "Failed!" };
            println!("Deleting {} => {}", options.api_id, outcome);
        }
        Command::Update => {
            let successful = manager.update(&options.api_id, &options.url).await?;
            let outcome = if successful { "Success!" } else { "Failed!" };
            println!("API Update Complete: {}", outcome);
        }
    }

    Ok(())
}

/// Register the one-shot interrupt listener: on SIGINT/SIGTERM, sweep every
/// endpoint and exit. Nothing else runs concurrently with the sweep, and it
/// is not cancellable once started.
fn spawn_interrupt_cleanup(manager: Arc<GatewayProxyManager>) {
    tokio::spawn(async move {
        wait_for_interrupt().await;
        info!("interrupt received, cleaning up all endpoints");
        manager.cleanup_all().await;
        std::process::exit(1);
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl+C");
}
