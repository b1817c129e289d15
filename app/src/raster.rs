//! Software rendering of canvas shapes into an RGBA buffer.
//!
//! Pixels are sampled at their centers. Colors are straight (unmultiplied)
//! RGBA and are composited source-over onto an opaque destination, once per
//! pixel per primitive, so translucent strokes do not darken where segments
//! overlap.

use image::{Rgba, RgbaImage};

pub type Point = (f32, f32);

/// Source-over blend of `color` onto an opaque pixel.
pub fn blend(pixel: &mut Rgba<u8>, color: Rgba<u8>) {
    let alpha = f32::from(color.0[3]) / 255.0;
    for c in 0..3 {
        let src = f32::from(color.0[c]);
        let dst = f32::from(pixel.0[c]);
        pixel.0[c] = (src * alpha + dst * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8;
    }
    pixel.0[3] = 255;
}

/// Composites `src` over `dst`. Both must have the same size; extra pixels of
/// the larger one are ignored.
pub fn overlay(dst: &mut RgbaImage, src: &RgbaImage) {
    let width = dst.width().min(src.width());
    let height = dst.height().min(src.height());
    for y in 0..height {
        for x in 0..width {
            let color = *src.get_pixel(x, y);
            blend(dst.get_pixel_mut(x, y), color);
        }
    }
}

/// Thick polyline with round joins and caps. A single point is drawn as a dot.
pub fn stroke_polyline(img: &mut RgbaImage, points: &[Point], width: f32, color: Rgba<u8>, closed: bool) {
    let Some(&first) = points.first() else {
        return;
    };
    let radius = (width / 2.0).max(0.5);
    let (mut min, mut max) = (first, first);
    for &(x, y) in points {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }

    let mut segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && points.len() > 2 {
        segments.push((points[points.len() - 1], first));
    }
    if segments.is_empty() {
        segments.push((first, first));
    }

    paint_where(img, (min.0 - radius, min.1 - radius), (max.0 + radius, max.1 + radius), color, |p| {
        segments
            .iter()
            .any(|&(a, b)| segment_distance(p, a, b) <= radius)
    });
}

/// Axis-aligned rectangle between two opposite corners.
pub fn fill_rect(img: &mut RgbaImage, corner: Point, opposite: Point, color: Rgba<u8>) {
    let min = (corner.0.min(opposite.0), corner.1.min(opposite.1));
    let max = (corner.0.max(opposite.0), corner.1.max(opposite.1));
    paint_where(img, min, max, color, |(x, y)| {
        x >= min.0 && x <= max.0 && y >= min.1 && y <= max.1
    });
}

pub fn fill_circle(img: &mut RgbaImage, center: Point, radius: f32, color: Rgba<u8>) {
    let min = (center.0 - radius, center.1 - radius);
    let max = (center.0 + radius, center.1 + radius);
    paint_where(img, min, max, color, |p| distance(p, center) <= radius);
}

/// Ring of the given stroke width centered on the circle outline.
pub fn stroke_circle(img: &mut RgbaImage, center: Point, radius: f32, width: f32, color: Rgba<u8>) {
    let half = (width / 2.0).max(0.5);
    let outer = radius + half;
    let min = (center.0 - outer, center.1 - outer);
    let max = (center.0 + outer, center.1 + outer);
    paint_where(img, min, max, color, |p| (distance(p, center) - radius).abs() <= half);
}

/// Blends `color` into every pixel of the clipped box `[min, max]` whose
/// center satisfies `inside`.
fn paint_where(
    img: &mut RgbaImage,
    min: Point,
    max: Point,
    color: Rgba<u8>,
    inside: impl Fn(Point) -> bool,
) {
    if img.width() == 0 || img.height() == 0 || max.0 < 0.0 || max.1 < 0.0 {
        return;
    }
    let x0 = min.0.floor().max(0.0) as u32;
    let y0 = min.1.floor().max(0.0) as u32;
    let x1 = (max.0.ceil() as u32).min(img.width() - 1);
    let y1 = (max.1.ceil() as u32).min(img.height() - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = (x as f32 + 0.5, y as f32 + 0.5);
            if inside(center) {
                blend(img.get_pixel_mut(x, y), color);
            }
        }
    }
}

fn distance(a: Point, b: Point) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Distance from `p` to the segment `[a, b]`.
fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + t * dx, a.1 + t * dy))
}
