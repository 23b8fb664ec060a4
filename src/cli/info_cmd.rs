//! Read-only commands: devices, formats, folder

use crate::application::ports::{CaptureBackend, SinkFactory};
use crate::application::RecordingController;
use crate::domain::error::RecordingError;

use super::presenter::Presenter;

/// Print input devices, as a table or JSON
pub fn handle_devices<C: CaptureBackend, S: SinkFactory>(
    controller: &RecordingController<C, S>,
    presenter: &Presenter,
    json: bool,
) -> Result<(), RecordingError> {
    let devices = controller.list_input_devices()?;

    if json {
        let text = serde_json::to_string_pretty(&devices)
            .map_err(|e| RecordingError::Device(format!("Failed to encode device list: {}", e)))?;
        presenter.output(&text);
        return Ok(());
    }

    if devices.is_empty() {
        presenter.warn("No audio input devices found");
        return Ok(());
    }
    for device in &devices {
        presenter.device(device);
    }
    Ok(())
}

/// Print formats that can be recorded, one per line
pub fn handle_formats<C: CaptureBackend, S: SinkFactory>(
    controller: &RecordingController<C, S>,
    presenter: &Presenter,
) {
    for format in controller.list_supported_formats() {
        presenter.output(format.as_str());
    }
}

/// Print the output folder, creating it first
pub fn handle_folder<C: CaptureBackend, S: SinkFactory>(
    controller: &RecordingController<C, S>,
    presenter: &Presenter,
) -> Result<(), RecordingError> {
    let folder = controller.output_folder()?;
    presenter.output(&folder.to_string_lossy());
    Ok(())
}
