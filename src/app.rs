//! Overlay process event loop
//!
//! One thread drives everything: a 20ms tick advances the hourglass and
//! requests a redraw, pointer input goes through `PointerGesture`, tray
//! clicks are polled when the loop goes idle, and dialog edits arrive as
//! user events. `OverlayModel` holds the windowless part so it can be
//! exercised without a display.

use anyhow::{Context, Result};
use std::time::Instant;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopWindowTarget};

use crate::config::{Settings, SettingsStore};
use crate::dialog::{DialogHandle, DialogMessage};
use crate::gesture::{GestureOutcome, PointerGesture};
use crate::hourglass::{HourglassState, TICK_INTERVAL};
use crate::overlay::OverlayWindow;
use crate::tray::{TrayEvent, TrayManager};

#[derive(Debug, Clone)]
pub enum UserEvent {
    /// Settings dialog -> overlay
    Dialog(DialogMessage),
}

/// Settings record plus the hourglass it configures
pub struct OverlayModel {
    store: SettingsStore,
    settings: Settings,
    hourglass: HourglassState,
    gesture: PointerGesture,
}

impl OverlayModel {
    pub fn new(store: SettingsStore, settings: Settings) -> Self {
        Self::with_hourglass(store, settings, HourglassState::new(&settings))
    }

    pub fn with_hourglass(
        store: SettingsStore,
        settings: Settings,
        hourglass: HourglassState,
    ) -> Self {
        OverlayModel {
            store,
            settings: settings.clamped(),
            hourglass,
            gesture: PointerGesture::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hourglass(&self) -> &HourglassState {
        &self.hourglass
    }

    pub fn tick(&mut self) {
        self.hourglass.tick();
    }

    pub fn pointer_pressed(&mut self, pointer: (i32, i32), origin: (i32, i32)) {
        self.gesture.press(pointer, origin);
    }

    /// Returns where the window should move to while dragging
    pub fn pointer_moved(&mut self, pointer: (i32, i32)) -> Option<(i32, i32)> {
        let origin = self.gesture.moved(pointer)?;
        self.settings.x = origin.0;
        self.settings.y = origin.1;
        Some(origin)
    }

    pub fn pointer_released(&mut self) -> GestureOutcome {
        let outcome = self.gesture.release();
        match outcome {
            GestureOutcome::Flip => {
                if !self.hourglass.flip() {
                    tracing::debug!("Click ignored, flip already running");
                }
            }
            GestureOutcome::Dragged { x, y } => {
                self.settings.x = x;
                self.settings.y = y;
                tracing::debug!("Overlay moved to ({}, {})", x, y);
            }
            GestureOutcome::Ignored => {}
        }
        outcome
    }

    /// Handle a dialog edit; returns the new window extent when it changed
    pub fn on_dialog(&mut self, message: DialogMessage) -> Option<u32> {
        match message {
            DialogMessage::Apply { size, duration } => {
                let before = self.hourglass.extent();
                self.settings = Settings {
                    size,
                    duration,
                    ..self.settings
                }
                .clamped();
                self.hourglass.apply_settings(&self.settings);
                tracing::info!(
                    "Settings changed: size {} duration {}s",
                    self.settings.size,
                    self.settings.duration
                );
                self.persist(None);

                let after = self.hourglass.extent();
                (after != before).then_some(after)
            }
            DialogMessage::Refill => {
                self.hourglass.refill();
                None
            }
        }
    }

    /// Best-effort save, taking the live window position when known
    pub fn persist(&mut self, position: Option<(i32, i32)>) {
        if let Some((x, y)) = position {
            self.settings.x = x;
            self.settings.y = y;
        }
        if let Err(e) = self.store.save(&self.settings) {
            tracing::warn!("Settings not saved: {}", e);
        }
    }
}

/// Application state
struct AppState {
    model: OverlayModel,
    overlay: OverlayWindow,
    tray: Option<TrayManager>,
    dialog: Option<DialogHandle>,
    proxy: winit::event_loop::EventLoopProxy<UserEvent>,
    cursor: (i32, i32),
    next_tick: Instant,
}

impl AppState {
    /// Cursor in screen coordinates
    fn pointer(&self) -> (i32, i32) {
        let (ox, oy) = self.origin();
        (ox + self.cursor.0, oy + self.cursor.1)
    }

    fn origin(&self) -> (i32, i32) {
        self.overlay
            .position()
            .unwrap_or((self.model.settings().x, self.model.settings().y))
    }
}

pub fn run() -> Result<()> {
    let store = SettingsStore::locate().unwrap_or_else(|e| {
        tracing::warn!("{}, keeping settings in the working directory", e);
        SettingsStore::new("settings.json")
    });
    let settings = store.load();
    tracing::info!("Loaded settings {:?} from {:?}", settings, store.path());

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;

    let model = OverlayModel::new(store, settings);
    let overlay = OverlayWindow::new(
        &event_loop,
        (model.settings().x, model.settings().y),
        model.hourglass().extent(),
    )?;

    // Keep running without a tray on platforms where it is unavailable
    let tray = match TrayManager::new() {
        Ok(tray) => Some(tray),
        Err(e) => {
            tracing::warn!("No tray icon: {}", e);
            None
        }
    };

    let mut state = AppState {
        model,
        overlay,
        tray,
        dialog: None,
        proxy: event_loop.create_proxy(),
        cursor: (0, 0),
        next_tick: Instant::now() + TICK_INTERVAL,
    };

    tracing::info!("Hourglass started");

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { event, window_id } if window_id == state.overlay.id() => {
                handle_window_event(event, &mut state, elwt);
            }

            Event::UserEvent(UserEvent::Dialog(message)) => {
                if let Some(extent) = state.model.on_dialog(message) {
                    state.overlay.set_extent(extent);
                }
                state.overlay.request_redraw();
            }

            Event::AboutToWait => {
                let now = Instant::now();
                if now >= state.next_tick {
                    state.model.tick();
                    state.overlay.request_redraw();
                    state.next_tick += TICK_INTERVAL;
                    if state.next_tick <= now {
                        state.next_tick = now + TICK_INTERVAL;
                    }
                }

                if let Some(tray_event) = state.tray.as_ref().and_then(|t| t.poll_events()) {
                    handle_tray_event(tray_event, &mut state, elwt);
                }

                if let Some(dialog) = state.dialog.as_mut() {
                    if !dialog.is_running() {
                        state.dialog = None;
                    }
                }

                elwt.set_control_flow(ControlFlow::WaitUntil(state.next_tick));
            }

            Event::LoopExiting => {
                let position = state.overlay.position();
                state.model.persist(position);
            }

            _ => {}
        }
    })?;

    Ok(())
}

fn handle_window_event(
    event: WindowEvent,
    state: &mut AppState,
    elwt: &EventLoopWindowTarget<UserEvent>,
) {
    match event {
        WindowEvent::RedrawRequested => {
            if let Err(e) = state.overlay.render(state.model.hourglass()) {
                tracing::warn!("Frame dropped: {}", e);
            }
        }

        WindowEvent::CursorMoved { position, .. } => {
            state.cursor = (position.x.round() as i32, position.y.round() as i32);
            let pointer = state.pointer();
            if let Some((x, y)) = state.model.pointer_moved(pointer) {
                state.overlay.move_to(x, y);
            }
        }

        WindowEvent::MouseInput {
            state: button_state,
            button: MouseButton::Left,
            ..
        } => match button_state {
            ElementState::Pressed => {
                let (pointer, origin) = (state.pointer(), state.origin());
                state.model.pointer_pressed(pointer, origin);
            }
            ElementState::Released => {
                if state.model.pointer_released() == GestureOutcome::Flip {
                    state.overlay.request_redraw();
                }
            }
        },

        WindowEvent::CloseRequested => {
            if let Some(tray_event) = close_request_action(state.tray.is_some()) {
                handle_tray_event(tray_event, state, elwt);
            }
        }

        _ => {}
    }
}

/// Quit is normally a tray action; without a tray, closing the window is
/// the only way out
fn close_request_action(has_tray: bool) -> Option<TrayEvent> {
    (!has_tray).then_some(TrayEvent::Quit)
}

/// Handle tray menu events
fn handle_tray_event(
    event: TrayEvent,
    state: &mut AppState,
    elwt: &EventLoopWindowTarget<UserEvent>,
) {
    match event {
        TrayEvent::OpenSettings => open_settings(state),

        TrayEvent::Quit => {
            let position = state.overlay.position();
            state.model.persist(position);
            state.tray = None;
            if let Some(mut dialog) = state.dialog.take() {
                dialog.close();
            }
            elwt.exit();
        }
    }
}

fn open_settings(state: &mut AppState) {
    if state.dialog.is_some() {
        tracing::debug!("Settings dialog already open");
        return;
    }

    let proxy = state.proxy.clone();
    match DialogHandle::spawn(state.model.settings(), move |message| {
        let _ = proxy.send_event(UserEvent::Dialog(message));
    }) {
        Ok(handle) => state.dialog = Some(handle),
        Err(e) => tracing::error!("Failed to open settings: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model_in(dir: &tempfile::TempDir) -> OverlayModel {
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let settings = store.load();
        let hourglass = HourglassState::with_rng(&settings, fastrand::Rng::with_seed(1));
        OverlayModel::with_hourglass(store, settings, hourglass)
    }

    fn stored(dir: &tempfile::TempDir) -> Settings {
        SettingsStore::new(dir.path().join("settings.json"))
            .try_load()
            .unwrap()
    }

    #[test]
    fn test_fresh_start_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        assert_eq!(*model.settings(), Settings::default());

        for _ in 0..1500 {
            model.tick();
        }
        assert!((model.hourglass().remaining_seconds() - 30.0).abs() < 1e-6);
        assert!((model.hourglass().ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_click_flips() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        model.pointer_pressed((250, 250), (200, 200));
        assert_eq!(model.pointer_released(), GestureOutcome::Flip);
        assert!(model.hourglass().is_animating());
        assert_eq!((model.settings().x, model.settings().y), (200, 200));
    }

    #[test]
    fn test_drag_tracks_position_without_flipping() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        model.pointer_pressed((250, 250), (200, 200));
        assert_eq!(model.pointer_moved((253, 251)), None);
        assert_eq!(model.pointer_moved((350, 280)), Some((300, 230)));
        assert_eq!((model.settings().x, model.settings().y), (300, 230));

        assert_eq!(
            model.pointer_released(),
            GestureOutcome::Dragged { x: 300, y: 230 }
        );
        assert!(!model.hourglass().is_animating());
    }

    #[test]
    fn test_dialog_apply_resizes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        for _ in 0..100 {
            model.tick();
        }
        let remaining = model.hourglass().remaining_seconds();

        let extent = model.on_dialog(DialogMessage::Apply {
            size: 100,
            duration: 300,
        });
        assert_eq!(extent, Some(160));
        assert_eq!(model.hourglass().total_seconds(), 300.0);
        assert_eq!(model.hourglass().remaining_seconds(), remaining);
        assert_eq!(
            stored(&dir),
            Settings {
                x: 200,
                y: 200,
                size: 100,
                duration: 300
            }
        );
    }

    #[test]
    fn test_dialog_duration_only_keeps_extent() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        let extent = model.on_dialog(DialogMessage::Apply {
            size: 64,
            duration: 90,
        });
        assert_eq!(extent, None);
        assert_eq!(stored(&dir).duration, 90);
    }

    #[test]
    fn test_dialog_apply_clamps_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        model.on_dialog(DialogMessage::Apply {
            size: 500,
            duration: 60,
        });
        assert_eq!(model.settings().size, 128);
        assert_eq!(model.hourglass().glass_size(), 128);
    }

    #[test]
    fn test_refill_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        for _ in 0..400 {
            model.tick();
        }
        model.pointer_pressed((0, 0), (0, 0));
        model.pointer_released();

        assert_eq!(model.on_dialog(DialogMessage::Refill), None);
        assert_eq!(model.hourglass().remaining_seconds(), 60.0);
        assert_eq!(model.hourglass().rotation_angle(), 0.0);
        assert!(!model.hourglass().is_flipped());
        assert_eq!(*model.settings(), Settings::default());
    }

    #[test]
    fn test_persist_merges_live_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_in(&dir);
        model.persist(Some((-15, 640)));
        assert_eq!(
            stored(&dir),
            Settings {
                x: -15,
                y: 640,
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("missing").join("settings.json"));
        let mut model = OverlayModel::new(store, Settings::default());
        model.persist(Some((1, 2)));
        assert_eq!((model.settings().x, model.settings().y), (1, 2));
    }

    #[test]
    fn test_close_quits_only_without_tray() {
        assert_eq!(close_request_action(false), Some(TrayEvent::Quit));
        assert_eq!(close_request_action(true), None);
    }
}
