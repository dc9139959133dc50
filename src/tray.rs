/// System tray icon for the overlay process
///
/// Two entries: "Settings" opens the dialog, "Quit" saves and exits.
/// Dropping the manager removes the icon from the tray.
use anyhow::{anyhow, Result};
use tiny_skia::{FillRule, Paint, Pixmap, Stroke, Transform};
use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::render::{VesselGeometry, SAND_RGBA};

const ICON_SIZE: u32 = 32;
const ICON_FILE: &str = "hourglass.ico";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    OpenSettings,
    Quit,
}

/// Load `hourglass.ico` next to the executable, or draw one
fn load_app_icon() -> Result<Icon> {
    let path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.join(ICON_FILE)));

    if let Some(path) = path.filter(|p| p.exists()) {
        let icon_data =
            std::fs::read(&path).map_err(|e| anyhow!("Failed to read {}: {}", ICON_FILE, e))?;

        let img = image::load_from_memory(&icon_data)
            .map_err(|e| anyhow!("Failed to decode icon: {}", e))?;

        let img = img.resize_exact(
            ICON_SIZE,
            ICON_SIZE,
            image::imageops::FilterType::Lanczos3,
        );
        let rgba = img.to_rgba8();

        return Icon::from_rgba(rgba.into_raw(), ICON_SIZE, ICON_SIZE)
            .map_err(|e| anyhow!("Failed to create icon from image: {:?}", e));
    }

    Icon::from_rgba(drawn_icon_rgba(), ICON_SIZE, ICON_SIZE)
        .map_err(|e| anyhow!("Failed to create fallback icon: {:?}", e))
}

/// Sand-filled glass silhouette as straight (non-premultiplied) RGBA
fn drawn_icon_rgba() -> Vec<u8> {
    let Some(mut pixmap) = Pixmap::new(ICON_SIZE, ICON_SIZE) else {
        return vec![0; (ICON_SIZE * ICON_SIZE * 4) as usize];
    };

    let edge = ICON_SIZE as f32;
    if let Some(path) = VesselGeometry::new(edge, edge, edge * 0.7).path() {
        let mut sand = Paint::default();
        sand.set_color_rgba8(SAND_RGBA[0], SAND_RGBA[1], SAND_RGBA[2], SAND_RGBA[3]);
        pixmap.fill_path(&path, &sand, FillRule::Winding, Transform::identity(), None);

        let mut outline = Paint::default();
        outline.set_color_rgba8(255, 255, 255, 255);
        let stroke = Stroke {
            width: 1.5,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &outline, &stroke, Transform::identity(), None);
    }

    pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

pub struct TrayManager {
    #[allow(dead_code)]
    tray_icon: TrayIcon,
    menu_item_settings: MenuId,
    menu_item_quit: MenuId,
}

impl TrayManager {
    pub fn new() -> Result<Self> {
        tracing::info!("Creating tray icon");

        let icon = load_app_icon()?;

        let menu = Menu::new();
        let settings_item = MenuItem::new("Settings", true, None);
        let separator = PredefinedMenuItem::separator();
        let quit_item = MenuItem::new("Quit", true, None);

        menu.append(&settings_item)
            .map_err(|e| anyhow!("Failed to add settings item: {}", e))?;
        menu.append(&separator)
            .map_err(|e| anyhow!("Failed to add separator: {}", e))?;
        menu.append(&quit_item)
            .map_err(|e| anyhow!("Failed to add quit item: {}", e))?;

        let menu_item_settings = settings_item.id().clone();
        let menu_item_quit = quit_item.id().clone();

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip("Hourglass")
            .with_icon(icon)
            .with_menu(Box::new(menu))
            .build()
            .map_err(|e| anyhow!("Failed to create tray icon: {}", e))?;

        tracing::info!("Tray icon created successfully with context menu");

        Ok(Self {
            tray_icon,
            menu_item_settings,
            menu_item_quit,
        })
    }

    /// Drain pending menu clicks, returning the first one we act on
    pub fn poll_events(&self) -> Option<TrayEvent> {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            tracing::debug!("Menu event: {:?}", event);
            if event.id == self.menu_item_settings {
                return Some(TrayEvent::OpenSettings);
            }
            if event.id == self.menu_item_quit {
                return Some(TrayEvent::Quit);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawn_icon_shape() {
        let rgba = drawn_icon_rgba();
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);

        let alpha_at = |x: u32, y: u32| rgba[((y * ICON_SIZE + x) * 4 + 3) as usize];
        // corners transparent, middle of the top bulb opaque
        assert_eq!(alpha_at(0, 0), 0);
        assert_eq!(alpha_at(ICON_SIZE / 2, ICON_SIZE / 4), 255);
    }
}
