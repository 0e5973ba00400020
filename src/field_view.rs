//! Maps the macroscopic field of the current generation to a display image.
//!
//! Sampling is nearest-cell; signed quantities (vorticity, density deviation) are centred on the
//! middle of the colormap, speed starts at its low end.

use crate::fluid::{MacroField, ObstacleGeometry};
use image::{Rgba, RgbaImage};

const SOLID_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GLYPH_COLOR: Rgba<u8> = Rgba([20, 20, 20, 255]);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldView {
    Vorticity,
    Speed,
    DensityDeviation,
}

impl FieldView {
    fn gain(&self) -> f32 {
        match self {
            FieldView::Vorticity => 25.0,
            FieldView::Speed => 4.0,
            FieldView::DensityDeviation => 50.0,
        }
    }

    fn is_signed(&self) -> bool {
        !matches!(self, FieldView::Speed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Colormap {
    Grayscale,
    /// HSL hue sweep from blue (240°) down to red (0°)
    Rainbow,
    Coolwarm,
}

impl Colormap {
    /// `t` is clamped to [0, 1].
    pub fn color(&self, t: f32) -> Rgba<u8> {
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Grayscale => {
                let v = to_byte(t);
                Rgba([v, v, v, 255])
            }
            Colormap::Rainbow => {
                let [r, g, b] = hsl_to_rgb((240.0 - 240.0 * t) / 360.0, 1.0, 0.5);
                Rgba([to_byte(r), to_byte(g), to_byte(b), 255])
            }
            Colormap::Coolwarm => {
                const COOL: [f32; 3] = [59.0, 76.0, 192.0];
                const MID: [f32; 3] = [221.0, 221.0, 221.0];
                const WARM: [f32; 3] = [180.0, 4.0, 38.0];
                let (a, b, s) = if t < 0.5 { (COOL, MID, t * 2.0) } else { (MID, WARM, t * 2.0 - 1.0) };
                let lerp = |i: usize| (a[i] + (b[i] - a[i]) * s).round() as u8;
                Rgba([lerp(0), lerp(1), lerp(2), 255])
            }
        }
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round() as u8
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s == 0.0 {
        return [l; 3];
    }
    let hue_to_rgb = |p: f32, q: f32, mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [hue_to_rgb(p, q, h + 1.0 / 3.0), hue_to_rgb(p, q, h), hue_to_rgb(p, q, h - 1.0 / 3.0)]
}

/// Per-cell scalar for `view`, in the field's row-major order.
///
/// Vorticity uses central differences with toroidal wrap, matching the lattice topology.
pub fn scalar_field(field: &MacroField, view: FieldView) -> Vec<f32> {
    let region = field.region;
    let mut values = Vec::with_capacity(field.cells.len());
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            let (x, y) = (x as i64, y as i64);
            let cell = field.get_wrapped(x, y);
            let v = match view {
                FieldView::Speed => cell.speed(),
                FieldView::DensityDeviation => cell.rho - 1.0,
                FieldView::Vorticity => {
                    let duy_dx =
                        (field.get_wrapped(x + 1, y).uy - field.get_wrapped(x - 1, y).uy) * 0.5;
                    let dux_dy =
                        (field.get_wrapped(x, y + 1).ux - field.get_wrapped(x, y - 1).ux) * 0.5;
                    duy_dx - dux_dy
                }
            };
            values.push(v);
        }
    }
    values
}

/// Renders `field` into a `width`×`height` image; obstacle cells are drawn white.
pub fn render_frame(
    field: &MacroField, geometry: &ObstacleGeometry, view: FieldView, colormap: Colormap,
    contrast: f32, width: u32, height: u32,
) -> RgbaImage {
    let region = field.region;
    let values = scalar_field(field, view);
    let scale = view.gain() * contrast;
    let offset = if view.is_signed() { 0.5 } else { 0.0 };

    RgbaImage::from_fn(width, height, |px, py| {
        let lx = (px as u64 * region.width as u64 / width as u64) as u32;
        let ly = (py as u64 * region.height as u64 / height as u64) as u32;
        let (x, y) = (region.x + lx, region.y + ly);
        if geometry.is_solid(x, y) {
            return SOLID_COLOR;
        }
        colormap.color(offset + scale * values[(lx + ly * region.width) as usize])
    })
}

/// Velocity sampled at one glyph probe.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VelocityGlyph {
    pub x: u32,
    pub y: u32,
    /// Unit direction, zero for a fluid cell at rest
    pub direction: [f32; 2],
    pub magnitude: f32,
}

/// Samples the velocity at every glyph probe of `geometry` that lies inside `field`.
pub fn velocity_glyphs(field: &MacroField, geometry: &ObstacleGeometry) -> Vec<VelocityGlyph> {
    geometry
        .glyph_probes
        .iter()
        .filter_map(|&(x, y)| {
            let cell = field.get(x, y)?;
            let magnitude = cell.speed();
            let direction =
                if magnitude > 0.0 { [cell.ux / magnitude, cell.uy / magnitude] } else { [0.0; 2] };
            Some(VelocityGlyph { x, y, direction, magnitude })
        })
        .collect()
}

/// Draws each glyph as a line from its cell, `length_per_speed` pixels per unit speed.
pub fn draw_glyphs(
    image: &mut RgbaImage, glyphs: &[VelocityGlyph], lattice: (u32, u32), length_per_speed: f32,
) {
    let sx = image.width() as f32 / lattice.0 as f32;
    let sy = image.height() as f32 / lattice.1 as f32;
    for g in glyphs {
        let x0 = (g.x as f32 + 0.5) * sx;
        let y0 = (g.y as f32 + 0.5) * sy;
        let len = g.magnitude * length_per_speed;
        let steps = len.ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = len * i as f32 / steps as f32;
            let px = x0 + g.direction[0] * t;
            let py = y0 + g.direction[1] * t;
            if px >= 0.0 && py >= 0.0 && (px as u32) < image.width() && (py as u32) < image.height()
            {
                image.put_pixel(px as u32, py as u32, GLYPH_COLOR);
            }
        }
    }
}
