//! Overlay window: frameless, transparent, always on top
//!
//! Frames are rasterised by `HourglassRenderer` into a tiny-skia pixmap. On
//! Windows the pixmap is presented through a layered window with per-pixel
//! alpha; elsewhere it is copied into a softbuffer surface, which is only
//! see-through where the windowing system composites the pixel's top byte.

use anyhow::{anyhow, Context, Result};
use std::rc::Rc;
use tiny_skia::Pixmap;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::EventLoopWindowTarget;
use winit::window::{Window, WindowBuilder, WindowId, WindowLevel};

use crate::hourglass::HourglassState;
use crate::render::{HourglassRenderer, Scene};

#[cfg(windows)]
mod layered;

#[cfg(windows)]
use layered::LayeredSurface as FrameSurface;

#[cfg(not(windows))]
use buffered::SoftbufferSurface as FrameSurface;

#[cfg(not(windows))]
mod buffered {
    use anyhow::{anyhow, Result};
    use std::num::NonZeroU32;
    use std::rc::Rc;
    use tiny_skia::Pixmap;
    use winit::window::Window;

    use crate::render::to_softbuffer;

    pub struct SoftbufferSurface {
        surface: softbuffer::Surface<Rc<Window>, Rc<Window>>,
        _context: softbuffer::Context<Rc<Window>>,
        window: Rc<Window>,
    }

    impl SoftbufferSurface {
        pub fn new(window: &Rc<Window>) -> Result<Self> {
            let context = softbuffer::Context::new(window.clone())
                .map_err(|e| anyhow!("Error creating softbuffer context: {}", e))?;
            let surface = softbuffer::Surface::new(&context, window.clone())
                .map_err(|e| anyhow!("Error creating softbuffer surface: {}", e))?;
            Ok(SoftbufferSurface {
                surface,
                _context: context,
                window: window.clone(),
            })
        }

        pub fn present(&mut self, pixmap: &Pixmap) -> Result<()> {
            let (Some(width), Some(height)) =
                (NonZeroU32::new(pixmap.width()), NonZeroU32::new(pixmap.height()))
            else {
                return Ok(());
            };

            self.surface
                .resize(width, height)
                .map_err(|e| anyhow!("Error resizing softbuffer surface: {}", e))?;

            let mut buffer = self
                .surface
                .buffer_mut()
                .map_err(|e| anyhow!("Error retrieving softbuffer buffer: {}", e))?;
            to_softbuffer(pixmap, &mut buffer);

            self.window.pre_present_notify();
            buffer
                .present()
                .map_err(|e| anyhow!("Error presenting overlay frame: {}", e))
        }
    }
}

pub struct OverlayWindow {
    surface: FrameSurface,
    window: Rc<Window>,
    pixmap: Pixmap,
    renderer: HourglassRenderer,
}

impl OverlayWindow {
    /// Create the window at `origin` with an `extent` x `extent` client area
    pub fn new<T>(
        target: &EventLoopWindowTarget<T>,
        origin: (i32, i32),
        extent: u32,
    ) -> Result<Self> {
        let builder = WindowBuilder::new()
            .with_title("Hourglass")
            .with_decorations(false)
            .with_resizable(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(PhysicalSize::new(extent, extent))
            .with_position(PhysicalPosition::new(origin.0, origin.1));

        // Layered windows carry their own alpha; no DWM blur-behind
        #[cfg(windows)]
        let builder = {
            use winit::platform::windows::WindowBuilderExtWindows;
            builder.with_skip_taskbar(true)
        };
        #[cfg(not(windows))]
        let builder = builder.with_transparent(true);

        let window = Rc::new(
            builder
                .build(target)
                .context("Failed to create overlay window")?,
        );

        let surface = FrameSurface::new(&window)?;

        let pixmap = Pixmap::new(extent.max(1), extent.max(1))
            .ok_or_else(|| anyhow!("Invalid overlay extent {}", extent))?;

        tracing::info!("Overlay window {}px at {:?}", extent, origin);

        Ok(OverlayWindow {
            surface,
            window,
            pixmap,
            renderer: HourglassRenderer::new(),
        })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Top-left corner on screen, when the platform reports it
    pub fn position(&self) -> Option<(i32, i32)> {
        self.window.outer_position().ok().map(|p| (p.x, p.y))
    }

    pub fn move_to(&self, x: i32, y: i32) {
        self.window.set_outer_position(PhysicalPosition::new(x, y));
    }

    pub fn set_extent(&self, extent: u32) {
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(extent, extent));
        self.window.request_redraw();
    }

    pub fn render(&mut self, state: &HourglassState) -> Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        if self.pixmap.width() != size.width || self.pixmap.height() != size.height {
            self.pixmap = Pixmap::new(size.width, size.height)
                .ok_or_else(|| anyhow!("Invalid overlay size {:?}", size))?;
        }

        let scene = Scene::build(state, size.width as f32, size.height as f32);
        self.renderer.paint(&scene, &mut self.pixmap);

        self.surface.present(&self.pixmap)
    }
}
