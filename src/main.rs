//! voxmemo CLI entry point

use std::process::ExitCode;

use clap::Parser;

use voxmemo::cli::{
    app::{create_controller, load_merged_config, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands, RecordOptions},
    config_cmd::handle_config_command,
    info_cmd::{handle_devices, handle_folder, handle_formats},
    init_logging,
    presenter::Presenter,
};
use voxmemo::domain::config::AppConfig;
use voxmemo::domain::recording::{compose_label, AudioFormat, Duration};
use voxmemo::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let presenter = Presenter::new();
    let store = XdgConfigStore::from_env();

    // Config commands work on the raw file, not the merged view
    let command = match cli.command {
        Some(Commands::Config { action }) => {
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        other => other,
    };

    // Build CLI config from args
    let cli_config = AppConfig {
        output_folder: cli.output.clone(),
        sample_rate: cli.sample_rate,
        channels: cli.channels,
        format: cli.format.map(|f| AudioFormat::from(f).to_string()),
        device: cli.device.clone(),
        ..Default::default()
    };

    // Merge config
    let config = load_merged_config(&store, cli_config).await;

    let output = match config.output_config() {
        Ok(output) => output,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match command {
        Some(Commands::Devices { json }) => {
            let controller = create_controller(output);
            return match handle_devices(&controller, &presenter, json) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_ERROR)
                }
            };
        }
        Some(Commands::Formats) => {
            handle_formats(&create_controller(output), &presenter);
            return ExitCode::SUCCESS;
        }
        Some(Commands::Folder) => {
            let controller = create_controller(output);
            return match handle_folder(&controller, &presenter) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_ERROR)
                }
            };
        }
        Some(Commands::Config { .. }) | None => {}
    }

    // Parse duration
    let duration = match cli.duration.as_ref() {
        Some(s) => match s.parse::<Duration>() {
            Ok(d) => Some(d),
            Err(e) => {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        },
        None => None,
    };

    // Resolve tags against the configured list
    let mut tags = Vec::with_capacity(cli.tags.len());
    for tag in &cli.tags {
        match config.find_tag(tag) {
            Some(found) => tags.push(found),
            None => {
                presenter.error(&format!(
                    "Unknown tag '{}'. Configured tags: {}",
                    tag,
                    config.tags_or_default().join(", ")
                ));
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        }
    }

    let options = RecordOptions {
        label: compose_label(&tags, cli.label.as_deref().unwrap_or("")),
        duration,
    };

    run_record(options, output).await
}
