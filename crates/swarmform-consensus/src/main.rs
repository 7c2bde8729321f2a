//! SwarmForm experiment runner
//!
//! Runs seeded formation experiments and streams JSON reports

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use swarmform_common::{FormationError, VERSION};
use swarmform_consensus::{
    build_algorithm,
    config::RunnerConfig,
    experiment::run_experiment,
    report::ReportSink,
    status::StatusReporter,
    CancellationToken, FormationAlgorithm,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting SwarmForm experiment runner v{}", VERSION);

    // Load configuration
    let config = RunnerConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let algorithm: Arc<dyn FormationAlgorithm> =
        Arc::from(build_algorithm(config.algorithm, &config.solver));
    let sink = ReportSink::new(&config.sink);
    let run_id = Uuid::now_v7();

    info!(
        "Algorithm={}, experiments={}, agents={}, seed_base={}",
        algorithm.name(),
        config.experiments.num_experiments,
        config.experiments.num_agents,
        config.experiments.seed_base
    );
    if let Some(addr) = sink.collector() {
        info!("Forwarding reports to {}", addr);
    }

    // Stop between experiments on Ctrl-C
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                cancel.cancel();
            }
        });
    }

    // Start status heartbeat
    let heartbeat = match &config.sink.status_url {
        Some(url) => {
            let reporter = StatusReporter::new(url.as_str(), algorithm.descriptor(), run_id)?;
            Some(reporter.start(Duration::from_secs(config.sink.status_interval_secs)))
        }
        None => None,
    };

    let outcome = run(&config, Arc::clone(&algorithm), &sink, run_id, &cancel).await;

    // Always announce offline, even when the run failed
    if let Some(heartbeat) = heartbeat {
        if let Err(e) = heartbeat.shutdown().await {
            warn!(error = %e, "Failed to send offline status");
        }
    }

    let completed = outcome?;
    info!(run_id = %run_id, completed, "Experiment run finished");
    Ok(())
}

/// Publish the descriptor, then run experiments until done or cancelled
async fn run(
    config: &RunnerConfig,
    algorithm: Arc<dyn FormationAlgorithm>,
    sink: &ReportSink,
    run_id: Uuid,
    cancel: &CancellationToken,
) -> Result<usize> {
    // Publish the descriptor first so collectors can label the reports
    let descriptor = algorithm.descriptor().to_json()?;
    if let Err(e) = sink.emit(&descriptor).await {
        warn!(error = %e, "Failed to publish algorithm descriptor");
    }

    let mut completed = 0;
    for experiment in 0..config.experiments.num_experiments {
        if cancel.is_cancelled() {
            break;
        }

        let algorithm = Arc::clone(&algorithm);
        let settings = config.experiments.clone();
        let token = cancel.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            run_experiment(algorithm.as_ref(), &settings, experiment, run_id, &token)
        })
        .await?;

        let report = match outcome {
            Ok(report) => report,
            Err(FormationError::Cancelled { iterations }) => {
                info!(experiment, iterations, "Experiment cancelled");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = sink.emit(&report.to_json()?).await {
            warn!(experiment, error = %e, "Failed to forward report");
        }
        completed += 1;
    }

    Ok(completed)
}
