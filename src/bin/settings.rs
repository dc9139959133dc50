//! Hourglass.Settings - settings dialog process
//!
//! Launched by the overlay with `--size N --duration N`. Edits are written
//! to stdout for the overlay, so logs go to stderr.

#![windows_subsystem = "windows"]

use hourglass_overlay::dialog::DialogFlags;
use hourglass_overlay::gui;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let flags = DialogFlags::parse(std::env::args().skip(1));
    tracing::info!("Settings dialog starting with {:?}", flags);

    gui::run(flags)?;

    Ok(())
}
