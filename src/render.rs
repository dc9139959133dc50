//! Vector rendering of the hourglass
//!
//! Rendering is split in two steps: `Scene::build` turns the current
//! `HourglassState` into plain geometry, and `HourglassRenderer::paint`
//! rasterises that geometry into a `tiny_skia::Pixmap`. Both are pure, so
//! painting an unchanged state twice yields identical pixels.

use tiny_skia::{
    Color, FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::hourglass::HourglassState;

/// Half width of the neck
const NECK_HALF_WIDTH: f32 = 4.0;
/// Vertical reach of the neck's curve handles
const NECK_HANDLE: f32 = 5.0;
/// Glass height relative to its width
const GLASS_ASPECT: f32 = 1.3;
/// Bulb curve handle offset relative to the glass size
const BULB_HANDLE: f32 = 0.3;

const OUTLINE_RGBA: [u8; 4] = [255, 255, 255, 150];
const GLASS_RGBA: [u8; 4] = [255, 255, 255, 20];
pub const SAND_RGBA: [u8; 4] = [230, 190, 100, 255];

/// Layout of the glass inside a square widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VesselGeometry {
    pub width: f32,
    pub height: f32,
    pub size: f32,
    pub margin_w: f32,
    pub margin_h: f32,
    pub mid_y: f32,
}

impl VesselGeometry {
    pub fn new(width: f32, height: f32, size: f32) -> Self {
        VesselGeometry {
            width,
            height,
            size,
            margin_w: (width - size) / 2.0,
            margin_h: (height - size * GLASS_ASPECT) / 2.0,
            mid_y: height / 2.0,
        }
    }

    /// Closed outline: flat rims joined by four curves meeting at the neck
    pub fn path(&self) -> Option<Path> {
        let (w, h, mw, mh, mid) = (
            self.width,
            self.height,
            self.margin_w,
            self.margin_h,
            self.mid_y,
        );
        let cx = w / 2.0;
        let cp = self.size * BULB_HANDLE;

        let mut pb = PathBuilder::new();
        pb.move_to(mw, mh);
        pb.line_to(w - mw, mh);
        pb.cubic_to(
            w - mw,
            mh + cp,
            cx + NECK_HALF_WIDTH,
            mid - NECK_HANDLE,
            cx + NECK_HALF_WIDTH,
            mid,
        );
        pb.cubic_to(
            cx + NECK_HALF_WIDTH,
            mid + NECK_HANDLE,
            w - mw,
            h - mh - cp,
            w - mw,
            h - mh,
        );
        pb.line_to(mw, h - mh);
        pb.cubic_to(
            mw,
            h - mh - cp,
            cx - NECK_HALF_WIDTH,
            mid + NECK_HANDLE,
            cx - NECK_HALF_WIDTH,
            mid,
        );
        pb.cubic_to(
            cx - NECK_HALF_WIDTH,
            mid - NECK_HANDLE,
            mw,
            mh + cp,
            mw,
            mh,
        );
        pb.close();
        pb.finish()
    }

    /// Sand line in the top bulb; the top band spans from here to the neck
    pub fn top_fill_line(&self, ratio: f32) -> f32 {
        self.margin_h + (self.mid_y - self.margin_h) * (1.0 - ratio)
    }

    /// Sand line in the bottom bulb; the bottom band spans from here to the base
    pub fn bottom_fill_line(&self, ratio: f32) -> f32 {
        self.base_y() - (self.mid_y - self.margin_h) * (1.0 - ratio)
    }

    pub fn base_y(&self) -> f32 {
        self.height - self.margin_h
    }
}

/// Horizontal band of sand covering the full widget width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandBand {
    pub top: f32,
    pub bottom: f32,
}

impl SandBand {
    fn rect(&self, width: f32) -> Option<Rect> {
        if self.bottom <= self.top {
            return None;
        }
        Rect::from_xywh(0.0, self.top, width, self.bottom - self.top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandFill {
    pub top: SandBand,
    pub bottom: SandBand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Everything one frame draws
#[derive(Debug, Clone)]
pub struct Scene {
    pub geometry: VesselGeometry,
    pub outline_width: f32,
    /// Vessel rotation in degrees about the widget center
    pub rotation: f32,
    /// Absent while flipping
    pub sand: Option<SandFill>,
    pub grains: Vec<Grain>,
}

impl Scene {
    pub fn build(state: &HourglassState, width: f32, height: f32) -> Self {
        let size = state.glass_size() as f32;
        let geometry = VesselGeometry::new(width, height, size);
        let outline_width = if size > 40.0 { 1.5 } else { 1.0 };
        let rotation = state.rotation_angle();

        if state.is_animating() {
            return Scene {
                geometry,
                outline_width,
                rotation,
                sand: None,
                grains: Vec::new(),
            };
        }

        let ratio = state.ratio() as f32;
        let sand = SandFill {
            top: SandBand {
                top: geometry.top_fill_line(ratio),
                bottom: geometry.mid_y,
            },
            bottom: SandBand {
                top: geometry.bottom_fill_line(ratio),
                bottom: geometry.base_y(),
            },
        };

        let grains = if ratio > 0.0 && ratio < 1.0 {
            state
                .particles()
                .iter()
                .map(|p| Grain {
                    x: p.x,
                    y: p.y,
                    radius: p.size,
                })
                .collect()
        } else {
            Vec::new()
        };

        Scene {
            geometry,
            outline_width,
            rotation,
            sand: Some(sand),
            grains,
        }
    }
}

fn solid(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

/// Rasterises scenes into a pixmap
#[derive(Debug, Default)]
pub struct HourglassRenderer;

impl HourglassRenderer {
    pub fn new() -> Self {
        HourglassRenderer
    }

    pub fn paint(&self, scene: &Scene, pixmap: &mut Pixmap) {
        pixmap.fill(Color::TRANSPARENT);

        let Some(vessel) = scene.geometry.path() else {
            tracing::warn!("Degenerate vessel for {:?}", scene.geometry);
            return;
        };
        let center_x = scene.geometry.width / 2.0;
        let center_y = scene.geometry.height / 2.0;
        let turn = Transform::from_rotate_at(scene.rotation, center_x, center_y);

        pixmap.fill_path(&vessel, &solid(GLASS_RGBA), FillRule::Winding, turn, None);
        let stroke = Stroke {
            width: scene.outline_width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&vessel, &solid(OUTLINE_RGBA), &stroke, turn, None);

        if let Some(sand) = &scene.sand {
            // Clip follows the turned glass, the bands stay level
            if let Some(mut clip) = Mask::new(pixmap.width(), pixmap.height()) {
                clip.fill_path(&vessel, FillRule::Winding, true, turn);
                let paint = solid(SAND_RGBA);
                for band in [sand.top, sand.bottom] {
                    if let Some(rect) = band.rect(scene.geometry.width) {
                        pixmap.fill_rect(rect, &paint, Transform::identity(), Some(&clip));
                    }
                }
            }
        }

        let paint = solid(SAND_RGBA);
        for grain in &scene.grains {
            if let Some(dot) = PathBuilder::from_circle(grain.x, grain.y, grain.radius) {
                pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }
}

/// Copy premultiplied RGBA pixels into softbuffer's 0xAARRGGBB words.
/// The alpha byte is only honoured where the compositor reads it.
pub fn to_softbuffer(pixmap: &Pixmap, buffer: &mut [u32]) {
    for (dst, px) in buffer.iter_mut().zip(pixmap.pixels()) {
        *dst = (u32::from(px.alpha()) << 24)
            | (u32::from(px.red()) << 16)
            | (u32::from(px.green()) << 8)
            | u32::from(px.blue());
    }
}

/// Swizzle premultiplied RGBA pixels into the BGRA byte order of a 32-bit DIB
pub fn to_bgra_premultiplied(pixmap: &Pixmap, dst: &mut [u8]) {
    for (out, px) in dst.chunks_exact_mut(4).zip(pixmap.pixels()) {
        out.copy_from_slice(&[px.blue(), px.green(), px.red(), px.alpha()]);
    }
}
