// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing capture devices
//! - Listing the lenses offered per position
//! - Taking photos through the full controller flow

use camera_core::backends::camera::{CameraPosition, CapturePlatform, MediaType};
use camera_core::backends::virtual_camera::{VirtualMotion, VirtualPlatform};
use camera_core::pipelines::photo::PhotoEncoder;
use camera_core::settings::{JsonFileSettings, MemorySettings, SettingsStore};
use camera_core::{AspectRatio, CaptureController, CaptureRequest, Config};
use std::path::PathBuf;
use std::sync::Arc;

/// Folder under the pictures directory
const DEFAULT_SAVE_FOLDER: &str = "camera";

/// Options for `photo`
pub struct PhotoOptions {
    pub position: CameraPosition,
    pub lens: Option<String>,
    pub zoom: Option<f64>,
    pub ratio: Option<AspectRatio>,
    pub output: Option<PathBuf>,
}

fn load_config() -> Config {
    Config::default_path()
        .map(|path| {
            Config::load(&path).unwrap_or_else(|e| {
                eprintln!("Warning: {}", e.user_message());
                tracing::warn!(error = %e, "Falling back to default config");
                Config::default()
            })
        })
        .unwrap_or_default()
}

fn open_settings() -> Arc<dyn SettingsStore> {
    match JsonFileSettings::default_path() {
        Some(path) => Arc::new(JsonFileSettings::open(path)),
        None => Arc::new(MemorySettings::new()),
    }
}

fn build_controller(platform: VirtualPlatform) -> Result<CaptureController, Box<dyn std::error::Error>> {
    Ok(CaptureController::new(
        Arc::new(platform),
        Arc::new(VirtualMotion::new()),
        open_settings(),
        load_config(),
    )?)
}

/// List all capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let platform = VirtualPlatform::phone();
    let devices = platform.discover_devices(MediaType::Video, None);

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        let caps = &device.capabilities;
        println!("  [{}] {}", index, device);
        println!(
            "      Zoom: {:.1}x-{:.1}x  ISO: {}-{}  Flash: {}",
            caps.zoom_range.min,
            caps.zoom_range.max,
            caps.iso_range.min,
            caps.iso_range.max,
            if caps.has_flash { "yes" } else { "no" }
        );
        if let Some(still) = caps.max_still_resolution {
            println!("      Max still: {}", still);
        }
        println!();
    }

    Ok(())
}

/// List the lenses offered for a position
pub fn list_lenses(position: CameraPosition) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let controller = build_controller(VirtualPlatform::phone())?;
        let lenses = controller.available_lenses(position).await;
        if lenses.is_empty() {
            println!("No {} lenses found.", position);
            return Ok(());
        }
        println!("Lenses ({}):", position);
        for lens in lenses {
            println!("  {} ({})", lens.name, lens.lens_type);
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Take a photo
pub fn take_photo(options: PhotoOptions) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let controller = build_controller(VirtualPlatform::phone())?;
        controller.setup().await?;

        if options.position != CameraPosition::Back {
            controller.switch_position(options.position).await?;
        }
        if let Some(name) = options.lens.as_deref() {
            let lenses = controller.available_lenses(options.position).await;
            let lens = lenses
                .into_iter()
                .find(|lens| lens.name == name)
                .ok_or_else(|| format!("Lens {} not available", name))?;
            let message = controller.switch_lens(lens).await?;
            println!("{}", message);
        }
        if let Some(zoom) = options.zoom {
            match controller.set_zoom(zoom) {
                Some(applied) => println!("Zoom: {:.2}x", applied),
                None => println!("Zoom request dropped"),
            }
        }
        if let Some(ratio) = options.ratio {
            controller.set_aspect_ratio(ratio);
        }

        controller.start_orientation_updates();
        controller.start().await?;

        println!("Capturing...");
        let result = controller.capture(CaptureRequest::default()).await;
        controller.shutdown().await?;
        let photo = result.map_err(|e| {
            eprintln!("{}", e.user_message());
            e
        })?;
        println!(
            "Captured {}x{} ({})",
            photo.image.width(),
            photo.image.height(),
            controller.aspect_ratio()
        );

        let output_dir = match options.output.as_ref() {
            Some(path) if path.is_dir() => path.clone(),
            Some(path) => path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(get_default_photo_dir),
            None => get_default_photo_dir(),
        };
        let saved = PhotoEncoder::default().save(photo.image, &output_dir).await?;

        // If user specified a specific filename, rename the file
        if let Some(user_path) = options.output
            && !user_path.is_dir()
        {
            std::fs::rename(&saved, &user_path)?;
            println!("Photo saved: {}", user_path.display());
            return Ok(());
        }

        println!("Photo saved: {}", saved.display());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Get default photo directory
fn get_default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
