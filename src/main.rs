#![warn(clippy::all, rust_2018_idioms)]

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

use logs_insights::app::host_runner::{self, CliArgs, RunStatus};

const DEFAULT_LOG_DIRECTIVES: &str = "logs_insights=info,aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,aws_sdk_cloudwatchlogs=info,hyper=warn,aws_smithy_http=warn";
const VERBOSE_LOG_DIRECTIVES: &str = "logs_insights=debug,aws_config=info,aws_smithy_runtime=info,aws_sdk_cloudwatchlogs=debug,hyper=warn";

/// Exit code for a run interrupted with Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "", "logs-insights")
        .map(|proj_dirs| proj_dirs.data_dir().join("logs"))
}

/// File logging under the project data dir, plus stderr with `--verbose`.
///
/// `RUST_LOG` replaces the default directives. Returns the log file path when
/// file logging could be set up.
fn init_logging(verbose: bool) -> Option<PathBuf> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = if verbose {
            VERBOSE_LOG_DIRECTIVES
        } else {
            DEFAULT_LOG_DIRECTIVES
        };
        tracing_subscriber::EnvFilter::new(directives)
    });

    let log_file = log_dir().and_then(|log_dir| {
        std::fs::create_dir_all(&log_dir).ok()?;
        let log_path = log_dir.join("logs-insights.log");

        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&log_path)
            .map_err(|e| eprintln!("Failed to open log file {:?}: {}", log_path, e))
            .ok()?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = file.metadata() {
                let mut perms = metadata.permissions();
                perms.set_mode(0o600);
                if let Err(e) = std::fs::set_permissions(&log_path, perms) {
                    eprintln!("[SECURITY] Failed to set log file permissions: {}", e);
                }
            }
        }

        Some((file, log_path))
    });

    let (file_layer, log_path) = match log_file {
        Some((file, log_path)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            ),
            Some(log_path),
        ),
        None => (None, None),
    };

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return None;
    }

    if let Some(path) = &log_path {
        tracing::info!("Logging initialized to: {:?}", path);
    }
    log_path
}

fn setup_panic_handler() {
    // Install a panic handler that writes to a crash log file
    // This catches panics even if normal logging hasn't been initialized yet
    std::panic::set_hook(Box::new(|panic_info| {
        let crash_msg = format!(
            "logs-insights crashed!\n\
             Panic occurred at: {}\n\
             Details: {}\n\
             Backtrace:\n{:?}\n",
            panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string()),
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic"),
            std::backtrace::Backtrace::force_capture()
        );

        let crash_log_path = log_dir().and_then(|log_dir| {
            std::fs::create_dir_all(&log_dir).ok()?;
            let crash_log_path = log_dir.join("crash.log");
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&crash_log_path)
                .ok()?;

            use std::io::Write;
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(file, "\n=== CRASH at {} ===\n{}", timestamp, crash_msg).ok()?;
            Some(crash_log_path)
        });

        eprintln!("\n{}", crash_msg);
        if let Some(path) = crash_log_path {
            eprintln!("Crash log written to: {:?}", path);
        }
    }));
}

fn main() -> ExitCode {
    // Set up panic handler BEFORE anything else to catch early crashes
    setup_panic_handler();

    let args = CliArgs::parse();
    init_logging(args.verbose);

    tracing::info!(
        "logs-insights {} starting: function={} interval={} query={:?}",
        host_runner::cli::LONG_VERSION,
        args.function,
        args.interval,
        args.query
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(host_runner::run(args)) {
        Ok(RunStatus::Finished) => ExitCode::SUCCESS,
        Ok(RunStatus::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(err) => {
            tracing::error!("Run failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
