// # gwddns-watch - gateway watcher
//
// Polls gateway health and runs `gwddns --force-update
// --reason=Gateway-Event` (plus `--ipv4only` when no IPv6 DynDNS entry is
// enabled) whenever the status map changes. Runs until SIGTERM or SIGINT.
//
// Only the platform, health and watch variables are read; publisher
// settings belong to the reconciler process.

use std::process::ExitCode;

use clap::Parser;
use gwddnsd::cli::WatchArgs;
use gwddnsd::trigger::CommandTrigger;
use gwddnsd::{GwddnsExitCode, app, env, logging};
use tokio::sync::oneshot;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match WatchArgs::try_parse() {
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

    let lookup = &env::process_env;
    let settings = env::platform(lookup).and_then(|platform| {
        let policy = env::health(lookup)?;
        let (interval, timeout) =
            app::watch_settings(env::watch(lookup)?, args.interval_secs, args.timeout_secs)?;
        let level = logging::effective_level(env::log_level(lookup)?, args.quiet);
        Ok((platform, policy, interval, timeout, level))
    });
    let (platform, policy, interval, timeout, level) = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return GwddnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = logging::init(level) {
        eprintln!("{}", e);
        return GwddnsExitCode::ConfigError.into();
    }

    let program = match args.reconciler.clone() {
        Some(path) => path,
        None => match CommandTrigger::sibling_reconciler() {
            Ok(path) => path,
            Err(e) => {
                error!("Cannot locate the gwddns binary, pass --reconciler: {}", e);
                return GwddnsExitCode::ConfigError.into();
            }
        },
    };
    let trigger = CommandTrigger::new(program, timeout);
    info!(
        "Triggering {} on gateway changes (timeout {:?})",
        trigger.program().display(),
        timeout
    );

    let watcher = match app::build_watcher(&app::registry(), &platform, policy, trigger) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("Startup error: {}", e);
            return GwddnsExitCode::ConfigError.into();
        }
    };

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
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            match app::wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown error: {}", e),
            }
            let _ = shutdown_tx.send(());
        });

        watcher.prime().await;
        match watcher.run_with_shutdown(interval, Some(shutdown_rx)).await {
            Ok(()) => GwddnsExitCode::Success,
            Err(e) => {
                error!("Watcher error: {}", e);
                GwddnsExitCode::RuntimeError
            }
        }
    })
    .into()
}
