//! Main app runner for recording mode

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::time::{interval, sleep_until, Instant};
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::application::RecordingController;
use crate::domain::config::AppConfig;
use crate::domain::recording::{format_clock, OutputConfiguration};
use crate::infrastructure::{CpalCapture, EncoderSinkFactory};

use super::args::RecordOptions;
use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment override for the output folder
pub const OUTPUT_FOLDER_ENV: &str = "VOXMEMO_OUTPUT_FOLDER";

const TICK_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// Controller wired to the real audio stack
pub type AppController = RecordingController<CpalCapture, EncoderSinkFactory>;

/// Build a controller for the platform's audio host
pub fn create_controller(config: OutputConfiguration) -> AppController {
    RecordingController::new(CpalCapture::new(), EncoderSinkFactory::new(), config)
}

/// Record until Ctrl+C or the optional duration elapses
pub async fn run_record(options: RecordOptions, config: OutputConfiguration) -> ExitCode {
    let mut presenter = Presenter::new();
    let controller = Arc::new(create_controller(config));

    // Device setup and thread spawns block; keep them off the runtime
    let start_controller = Arc::clone(&controller);
    let label = options.label.clone();
    let path = match tokio::task::spawn_blocking(move || start_controller.start(&label)).await {
        Ok(Ok(path)) => path,
        Ok(Err(e)) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&format!("Recording task failed: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let stop_after = options.duration.map(|d| d.as_std());
    presenter.info(&format!("Recording to {}", path.display()));
    let message = presenter.format_recording(StdDuration::ZERO, stop_after);
    presenter.start_spinner(&message);

    let deadline = stop_after.map(|d| Instant::now() + d);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    presenter.warn(&format!("Failed to listen for Ctrl+C: {}", e));
                }
                debug!("stop requested");
                break;
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                debug!("duration reached");
                break;
            }
            _ = ticker.tick() => {
                if let Some(session) = controller.active_session() {
                    presenter.update_recording(session.elapsed(), stop_after);
                }
            }
        }
    }

    let stop_controller = Arc::clone(&controller);
    let stopped = match tokio::task::spawn_blocking(move || stop_controller.stop()).await {
        Ok(stopped) => stopped,
        Err(e) => {
            presenter.spinner_fail("Recording did not stop cleanly");
            presenter.error(&format!("Recording task failed: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let Some(mut stopped) = stopped else {
        presenter.spinner_fail("No recording was running");
        return ExitCode::from(EXIT_ERROR);
    };

    // Don't exit while the writer still holds unwritten audio
    if let Some(state) = stopped.pending.as_ref().map(|pending| pending.state()) {
        presenter.update_spinner(&format!("Finishing file (writer {})...", state));
        stopped = match tokio::task::spawn_blocking(move || {
            stopped.wait_for_writer();
            stopped
        })
        .await
        {
            Ok(stopped) => stopped,
            Err(e) => {
                presenter.spinner_fail("Recording did not stop cleanly");
                presenter.error(&format!("Recording task failed: {}", e));
                return ExitCode::from(EXIT_ERROR);
            }
        };
    }

    presenter.spinner_success(&format!("Recorded {}", format_clock(stopped.duration)));
    for warning in &stopped.warnings {
        presenter.warn(&warning.to_string());
    }
    presenter.output(&stopped.path.to_string_lossy());
    ExitCode::from(EXIT_SUCCESS)
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: AppConfig) -> AppConfig {
    let file_config = store.load_or_empty().await;

    let env_config = AppConfig {
        output_folder: env::var(OUTPUT_FOLDER_ENV).ok().filter(|s| !s.trim().is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}
