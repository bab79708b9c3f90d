// # gwddns - one reconciliation run
//
// Reads configuration from `GWDDNS_*` environment variables, runs the
// reconciler once and exits:
//
// - 0: published, nothing to do, or dry run
// - 1: configuration error
// - 2: publish failure or runtime error

use std::process::ExitCode;

use clap::Parser;
use gwddns_core::RunOutcome;
use gwddnsd::cli::ReconcileArgs;
use gwddnsd::{GwddnsExitCode, app, env, logging};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match ReconcileArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                GwddnsExitCode::ConfigError.into()
            } else {
                GwddnsExitCode::Success.into()
            };
        }
    };

    let config = match env::reconciler_config(&env::process_env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return GwddnsExitCode::ConfigError.into();
        }
    };

    let level = match env::log_level(&env::process_env) {
        Ok(level) => logging::effective_level(level, args.quiet),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return GwddnsExitCode::ConfigError.into();
        }
    };
    if let Err(e) = logging::init(level) {
        eprintln!("{}", e);
        return GwddnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return GwddnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let registry = app::registry();
        let (reconciler, events) = match app::build_reconciler(&registry, &config).await {
            Ok(built) => built,
            Err(e) => {
                error!("Startup error: {}", e);
                return GwddnsExitCode::ConfigError;
            }
        };
        let logger = app::spawn_event_logger(events);

        let code = match reconciler.run(&args.run_options()).await {
            Ok(report) => match report.outcome {
                RunOutcome::Unchanged => {
                    info!("No changes detected. Nothing to do.");
                    GwddnsExitCode::Success
                }
                RunOutcome::DryRun => {
                    info!("Dry run finished without publishing");
                    GwddnsExitCode::Success
                }
                RunOutcome::Published => {
                    info!(
                        "DNS update successful ({} marker(s) written, {} failed)",
                        report.markers_written, report.marker_failures
                    );
                    GwddnsExitCode::Success
                }
                RunOutcome::PublishFailed { error } => {
                    error!("DNS update failed: {}", error);
                    GwddnsExitCode::RuntimeError
                }
            },
            Err(e) => {
                error!("Reconciliation error: {}", e);
                GwddnsExitCode::RuntimeError
            }
        };

        drop(reconciler);
        let _ = logger.await;
        code
    })
    .into()
}
