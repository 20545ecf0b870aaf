//! Jilo Server Entry Point

use clap::Parser;
use jilo_server::cli::{check, Cli, Commands};
use jilo_server::config::MonitorConfig;
use jilo_server::db::schema::prompt_table_creation;
use jilo_server::shutdown::ShutdownController;
use jilo_server::{bootstrap, logging, server};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = MonitorConfig::load(cli.config.as_deref());
    let config = &loaded.config;

    let _log_guard = match logging::init(config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };
    loaded.log_outcome();

    let shutdown = ShutdownController::default();

    let liveness = config.health_check_enabled.then(|| {
        server::spawn_liveness(
            config.health_check_port,
            config.health_check_endpoint.clone(),
            shutdown.clone(),
        )
    });

    // 確認プロンプトは標準入力をブロックするため、ランタイムのワーカーを明け渡す
    let confirm = || {
        tokio::task::block_in_place(|| {
            prompt_table_creation(std::io::stdin().lock(), std::io::stdout())
        })
    };

    let ctx = match bootstrap::initialize(config, cli.bootstrap_mode(), shutdown.clone(), confirm)
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "Startup failed");
            shutdown.request_shutdown();
            return ExitCode::FAILURE;
        }
    };

    if let Some(Commands::Check(args)) = &cli.command {
        let result = check::execute(args, &ctx).await;
        shutdown.request_shutdown();
        if let Some(liveness) = liveness {
            let _ = liveness.await;
        }
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Check failed");
                ExitCode::FAILURE
            }
        };
    }

    let handle = ctx.scheduler.spawn(ctx.agents.clone());
    if handle.is_empty() {
        warn!("No agents scheduled, waiting for shutdown signal");
    }

    server::shutdown_signal(shutdown.clone()).await;
    shutdown.request_shutdown();

    info!("Waiting for in-flight checks to finish");
    let aborted = handle.join().await;
    if !aborted.is_empty() {
        warn!(count = aborted.len(), "Some agent tasks ended abnormally");
    }
    if let Some(liveness) = liveness {
        let _ = liveness.await;
    }
    ctx.pool.close().await;

    info!("Jilo Server shutdown complete");
    ExitCode::SUCCESS
}
