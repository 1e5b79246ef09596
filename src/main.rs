use std::path::PathBuf;

use dicom_viewer_core::{
    Interpolation, LoadOptions, Orientation, VolumeLoader, WindowLevel, extract_frame,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dicom"));

    let series = match VolumeLoader::load_from_directory(&dir, &LoadOptions::default()) {
        Ok(series) => series,
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(1);
        }
    };

    let volume = &series.volume;
    let info = series.metadata.series_info();
    tracing::info!(
        description = info.description.as_deref().unwrap_or("N/A"),
        modality = info.modality.as_deref().unwrap_or("N/A"),
        dimensions = ?volume.dimensions(),
        spacing = ?volume.spacing(),
        "Series ready"
    );

    let (min, max) = volume.value_range();
    let window = volume
        .default_window()
        .or_else(|| WindowLevel::from_range(min as f64, max as f64).ok());
    let Some(window) = window else {
        tracing::error!("No usable window for value range {min}..{max}");
        std::process::exit(1);
    };

    for orientation in Orientation::ALL {
        let index = volume.extent(orientation) / 2;
        let frame = match extract_frame(volume, orientation, index, &window, Interpolation::Linear)
        {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("{err}");
                continue;
            }
        };
        let output = format!("{orientation}.png");
        match frame.to_image().map(|image| image.save(&output)) {
            Some(Ok(())) => tracing::info!("Saved {output}"),
            Some(Err(err)) => tracing::error!("Could not save {output}: {err}"),
            None => tracing::error!("Frame buffer does not match its dimensions"),
        }
    }
}
