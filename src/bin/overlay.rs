//! Hourglass overlay process
//!
//! This process manages:
//! - The always-on-top hourglass window
//! - System tray icon with Settings / Quit
//! - Settings persistence
//! - Launching the settings dialog process

#![windows_subsystem = "windows"]

use hourglass_overlay::app;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Hourglass overlay starting...");

    app::run()
}
