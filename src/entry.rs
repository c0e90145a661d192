use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};

use webprobe::ProbeEngine;
use webprobe::args::{Command, ProbeArgs, RequestArgs};
use webprobe::config::types::ConfigFile;
use webprobe::config::{endpoints_from, load_config, run_config_from, stress_config_from};
use webprobe::domain::{Endpoint, RunConfig};
use webprobe::error::{AppError, AppResult, ValidationError};
use webprobe::output::{Report, write_report};
use webprobe::system::{init_logging, setup_signal_handler, shutdown_channel};

pub(crate) fn run() -> AppResult<ExitCode> {
    let args = ProbeArgs::parse();
    init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let passed = runtime.block_on(run_async(&args))?;
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_async(args: &ProbeArgs) -> AppResult<bool> {
    let file = load_config(args.config.as_deref())?;
    let engine = Arc::new(ProbeEngine::with_reqwest()?);

    let (done_tx, done_rx) = shutdown_channel();
    let signal_handle = setup_signal_handler(Arc::clone(&engine), done_rx);

    let outcome = dispatch(&engine, file.as_ref(), &args.command).await;

    drop(done_tx.send(()));
    if let Err(err) = signal_handle.await {
        error!("Signal handler task failed: {}", err);
    }

    let report = outcome?;
    write_report(&report, args.format, args.output.as_deref()).await?;
    Ok(report.passed())
}

async fn dispatch(
    engine: &ProbeEngine,
    file: Option<&ConfigFile>,
    command: &Command,
) -> AppResult<Report> {
    match command {
        Command::Check(request) => {
            let (endpoints, config) = request_settings(file, request)?;
            info!("Checking {} endpoints", endpoints.len());
            Ok(Report::Batch(engine.test_endpoints(&endpoints, &config).await))
        }
        Command::Stress(stress) => {
            let (endpoints, run) = request_settings(file, &stress.request)?;
            let config = stress_config_from(file, stress, run)?;
            info!(
                "Stress testing {} endpoints at {} rps for {}ms",
                endpoints.len(),
                config.target_rps(),
                config.duration().as_millis()
            );
            Ok(Report::Stress(engine.stress_test(&endpoints, &config).await))
        }
        Command::Connectivity(connectivity) => {
            let config = run_config_from(file, &connectivity.run)?;
            debug!("Connectivity check for {:?}", connectivity.urls);
            Ok(Report::Batch(
                engine.test_connectivity(&connectivity.urls, &config).await,
            ))
        }
        Command::Health(request) => {
            let (endpoints, config) = request_settings(file, request)?;
            let endpoint = endpoints
                .first()
                .ok_or_else(|| AppError::validation(ValidationError::MissingEndpoints))?;
            Ok(Report::Single(engine.health_check(endpoint, &config).await))
        }
    }
}

fn request_settings(
    file: Option<&ConfigFile>,
    request: &RequestArgs,
) -> AppResult<(Vec<Endpoint>, RunConfig)> {
    let endpoints = endpoints_from(file, &request.endpoint)?;
    let config = run_config_from(file, &request.run)?;
    Ok((endpoints, config))
}
