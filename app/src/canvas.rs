use crate::raster::{self, Point};

use eframe::egui::{Pos2, Rect, Vec2};
use image::{imageops, Rgba, RgbaImage};
use live_mnist::LiveMnistError;
use std::fmt;
use std::str::FromStr;

/// How a pointer drag on the canvas is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingMode {
    FreeDraw,
    Line,
    Rect,
    Circle,
    /// Drag existing shapes around instead of drawing.
    Transform,
}

impl DrawingMode {
    pub const ALL: [DrawingMode; 5] = [
        DrawingMode::FreeDraw,
        DrawingMode::Line,
        DrawingMode::Rect,
        DrawingMode::Circle,
        DrawingMode::Transform,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrawingMode::FreeDraw => "freedraw",
            DrawingMode::Line => "line",
            DrawingMode::Rect => "rect",
            DrawingMode::Circle => "circle",
            DrawingMode::Transform => "transform",
        }
    }
}

impl fmt::Display for DrawingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DrawingMode {
    type Err = LiveMnistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DrawingMode::ALL
            .into_iter()
            .find(|mode| mode.label() == wanted)
            .ok_or_else(|| LiveMnistError::InvalidSetting {
                key: "canvas.drawing_mode",
                value: s.to_string(),
                reason: "expected freedraw, line, rect, circle or transform".to_string(),
            })
    }
}

/// Pen used for outlines and free strokes. Colors are unmultiplied RGBA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: Rgba<u8>,
}

/// One committed drawing object, in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Path {
        points: Vec<Pos2>,
        stroke: StrokeStyle,
    },
    Line {
        from: Pos2,
        to: Pos2,
        stroke: StrokeStyle,
    },
    Rect {
        corner: Pos2,
        opposite: Pos2,
        stroke: StrokeStyle,
        fill: Rgba<u8>,
    },
    Circle {
        center: Pos2,
        radius: f32,
        stroke: StrokeStyle,
        fill: Rgba<u8>,
    },
}

/// Extra slack around thin shapes so they can still be grabbed.
const GRAB_MARGIN: f32 = 4.0;

impl Shape {
    pub fn stroke(&self) -> StrokeStyle {
        match self {
            Shape::Path { stroke, .. }
            | Shape::Line { stroke, .. }
            | Shape::Rect { stroke, .. }
            | Shape::Circle { stroke, .. } => *stroke,
        }
    }

    /// Bounding box of the geometry, not counting the stroke width.
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Path { points, .. } => Rect::from_points(points),
            Shape::Line { from, to, .. } => Rect::from_two_pos(*from, *to),
            Shape::Rect {
                corner, opposite, ..
            } => Rect::from_two_pos(*corner, *opposite),
            Shape::Circle { center, radius, .. } => {
                Rect::from_center_size(*center, Vec2::splat(2.0 * radius))
            }
        }
    }

    /// Hit test used by transform mode.
    pub fn contains(&self, pos: Pos2) -> bool {
        let margin = (self.stroke().width / 2.0).max(GRAB_MARGIN);
        self.bounds().expand(margin).contains(pos)
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Path { points, .. } => {
                for p in points.iter_mut() {
                    *p += delta;
                }
            }
            Shape::Line { from, to, .. } => {
                *from += delta;
                *to += delta;
            }
            Shape::Rect {
                corner, opposite, ..
            } => {
                *corner += delta;
                *opposite += delta;
            }
            Shape::Circle { center, .. } => *center += delta,
        }
    }

    /// Whether the shape has anything to draw once the drag ends.
    fn is_visible(&self) -> bool {
        match self {
            Shape::Path { points, .. } => !points.is_empty(),
            Shape::Line { .. } => true,
            Shape::Rect {
                corner, opposite, ..
            } => (corner.x - opposite.x).abs() >= 1.0 && (corner.y - opposite.y).abs() >= 1.0,
            Shape::Circle { radius, .. } => *radius >= 1.0,
        }
    }

    fn rasterize_into(&self, img: &mut RgbaImage) {
        match self {
            Shape::Path { points, stroke } => {
                let points: Vec<Point> = points.iter().map(|p| (p.x, p.y)).collect();
                raster::stroke_polyline(img, &points, stroke.width, stroke.color, false);
            }
            Shape::Line { from, to, stroke } => {
                raster::stroke_polyline(
                    img,
                    &[(from.x, from.y), (to.x, to.y)],
                    stroke.width,
                    stroke.color,
                    false,
                );
            }
            Shape::Rect {
                corner,
                opposite,
                stroke,
                fill,
            } => {
                raster::fill_rect(img, (corner.x, corner.y), (opposite.x, opposite.y), *fill);
                let outline = [
                    (corner.x, corner.y),
                    (opposite.x, corner.y),
                    (opposite.x, opposite.y),
                    (corner.x, opposite.y),
                ];
                raster::stroke_polyline(img, &outline, stroke.width, stroke.color, true);
            }
            Shape::Circle {
                center,
                radius,
                stroke,
                fill,
            } => {
                raster::fill_circle(img, (center.x, center.y), *radius, *fill);
                raster::stroke_circle(img, (center.x, center.y), *radius, stroke.width, stroke.color);
            }
        }
    }
}

struct Drag {
    index: usize,
    last: Pos2,
}

/// The drawing surface: background, committed shapes and the shape currently
/// being drawn. Coordinates are canvas pixels with the origin top-left.
pub struct Canvas {
    width: u32,
    height: u32,
    background: Rgba<u8>,
    background_image: Option<RgbaImage>,
    shapes: Vec<Shape>,
    /// Shapes taken back by undo, most recent last.
    undone: Vec<Shape>,
    active: Option<Shape>,
    drag: Option<Drag>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            width,
            height,
            background: opaque(background),
            background_image: None,
            shapes: Vec::new(),
            undone: Vec::new(),
            active: None,
            drag: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn set_background(&mut self, color: Rgba<u8>) {
        self.background = opaque(color);
    }

    pub fn background_image(&self) -> Option<&RgbaImage> {
        self.background_image.as_ref()
    }

    /// Sets the image drawn under the shapes, stretched to the canvas size.
    pub fn set_background_image(&mut self, image: Option<RgbaImage>) {
        self.background_image = image.map(|img| {
            if img.dimensions() == (self.width, self.height) {
                img
            } else {
                imageops::resize(&img, self.width, self.height, imageops::FilterType::Triangle)
            }
        });
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The shape under construction while the pointer is held down.
    pub fn active(&self) -> Option<&Shape> {
        self.active.as_ref()
    }

    /// Index of the shape being dragged in transform mode.
    pub fn selected(&self) -> Option<usize> {
        self.drag.as_ref().map(|drag| drag.index)
    }

    pub fn is_blank(&self) -> bool {
        self.shapes.is_empty() && self.active.is_none() && self.background_image.is_none()
    }

    fn clamp(&self, pos: Pos2) -> Pos2 {
        Pos2::new(
            pos.x.clamp(0.0, self.width as f32),
            pos.y.clamp(0.0, self.height as f32),
        )
    }

    pub fn pointer_down(&mut self, pos: Pos2, mode: DrawingMode, stroke: StrokeStyle, fill: Rgba<u8>) {
        let pos = self.clamp(pos);
        self.active = match mode {
            DrawingMode::FreeDraw => Some(Shape::Path {
                points: vec![pos],
                stroke,
            }),
            DrawingMode::Line => Some(Shape::Line {
                from: pos,
                to: pos,
                stroke,
            }),
            DrawingMode::Rect => Some(Shape::Rect {
                corner: pos,
                opposite: pos,
                stroke,
                fill,
            }),
            DrawingMode::Circle => Some(Shape::Circle {
                center: pos,
                radius: 0.0,
                stroke,
                fill,
            }),
            DrawingMode::Transform => {
                // Topmost shape wins.
                self.drag = self
                    .shapes
                    .iter()
                    .rposition(|shape| shape.contains(pos))
                    .map(|index| Drag { index, last: pos });
                None
            }
        };
    }

    pub fn pointer_moved(&mut self, pos: Pos2) {
        let pos = self.clamp(pos);
        if let Some(shape) = &mut self.active {
            match shape {
                Shape::Path { points, .. } => {
                    if points.last().is_none_or(|last| last.distance(pos) >= 0.5) {
                        points.push(pos);
                    }
                }
                Shape::Line { to, .. } => *to = pos,
                Shape::Rect { opposite, .. } => *opposite = pos,
                Shape::Circle { center, radius, .. } => *radius = center.distance(pos),
            }
        } else if let Some(drag) = &mut self.drag {
            let delta = pos - drag.last;
            drag.last = pos;
            if let Some(shape) = self.shapes.get_mut(drag.index) {
                shape.translate(delta);
            }
        }
    }

    /// Ends the current gesture, committing the shape being drawn.
    pub fn pointer_up(&mut self) {
        if let Some(shape) = self.active.take().filter(Shape::is_visible) {
            self.shapes.push(shape);
            self.undone.clear();
        }
        self.drag = None;
    }

    /// Removes the most recent shape. Returns false if there was none.
    pub fn undo(&mut self) -> bool {
        self.drag = None;
        match self.shapes.pop() {
            Some(shape) => {
                self.undone.push(shape);
                true
            }
            None => false,
        }
    }

    /// Restores the most recently undone shape. Drawing a new shape forgets
    /// everything that could be redone.
    pub fn redo(&mut self) -> bool {
        self.drag = None;
        match self.undone.pop() {
            Some(shape) => {
                self.shapes.push(shape);
                true
            }
            None => false,
        }
    }

    /// Removes every shape. The background color and image stay.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.undone.clear();
        self.active = None;
        self.drag = None;
    }

    /// Renders background color, background image and shapes, in that order.
    pub fn rasterize(&self) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(self.width, self.height, self.background);
        if let Some(background) = &self.background_image {
            raster::overlay(&mut img, background);
        }
        for shape in self.shapes.iter().chain(self.active.iter()) {
            shape.rasterize_into(&mut img);
        }
        img
    }
}

fn opaque(color: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, _] = color.0;
    Rgba([r, g, b, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgba<u8> = Rgba([238, 238, 238, 255]);
    const FILL: Rgba<u8> = Rgba([255, 165, 0, 77]);

    fn pen(width: f32) -> StrokeStyle {
        StrokeStyle {
            width,
            color: Rgba([0, 0, 0, 255]),
        }
    }

    fn drag(canvas: &mut Canvas, mode: DrawingMode, from: (f32, f32), to: (f32, f32)) {
        canvas.pointer_down(Pos2::new(from.0, from.1), mode, pen(4.0), FILL);
        canvas.pointer_moved(Pos2::new(to.0, to.1));
        canvas.pointer_up();
    }

    #[test]
    fn test_blank_canvas_is_background() {
        let canvas = Canvas::new(40, 30, BACKGROUND);
        let img = canvas.rasterize();

        assert!(canvas.is_blank());
        assert_eq!(img.dimensions(), (40, 30));
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_freedraw_commits_on_release() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        canvas.pointer_down(Pos2::new(5.0, 20.0), DrawingMode::FreeDraw, pen(4.0), FILL);
        canvas.pointer_moved(Pos2::new(20.0, 20.0));
        canvas.pointer_moved(Pos2::new(35.0, 20.0));
        assert!(canvas.shapes().is_empty());
        assert!(canvas.active().is_some());

        canvas.pointer_up();
        assert_eq!(canvas.shapes().len(), 1);
        assert!(canvas.active().is_none());

        let img = canvas.rasterize();
        assert_eq!(*img.get_pixel(20, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(20, 30), BACKGROUND);
    }

    #[test]
    fn test_in_progress_stroke_is_rendered() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        canvas.pointer_down(Pos2::new(5.0, 20.0), DrawingMode::Line, pen(4.0), FILL);
        canvas.pointer_moved(Pos2::new(35.0, 20.0));

        assert_eq!(*canvas.rasterize().get_pixel(20, 20), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_rect_fill_is_translucent() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        drag(&mut canvas, DrawingMode::Rect, (5.0, 5.0), (35.0, 35.0));

        let img = canvas.rasterize();
        let inside = img.get_pixel(20, 20).0;
        for (channel, expected) in inside.iter().zip([243u8, 216, 166]) {
            assert!(channel.abs_diff(expected) <= 1, "{:?}", inside);
        }
        // Outline in the stroke color.
        assert_eq!(*img.get_pixel(5, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(38, 38), BACKGROUND);
    }

    #[test]
    fn test_circle_radius_follows_pointer() {
        let mut canvas = Canvas::new(60, 60, BACKGROUND);
        drag(&mut canvas, DrawingMode::Circle, (30.0, 30.0), (30.0, 45.0));

        match &canvas.shapes()[0] {
            Shape::Circle { radius, .. } => assert_eq!(*radius, 15.0),
            other => panic!("unexpected shape {:?}", other),
        }
        let img = canvas.rasterize();
        assert_eq!(*img.get_pixel(30, 45), Rgba([0, 0, 0, 255]));
        assert_ne!(*img.get_pixel(30, 30), BACKGROUND);
    }

    #[test]
    fn test_clicks_without_size_are_dropped() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        canvas.pointer_down(Pos2::new(10.0, 10.0), DrawingMode::Rect, pen(4.0), FILL);
        canvas.pointer_up();
        canvas.pointer_down(Pos2::new(10.0, 10.0), DrawingMode::Circle, pen(4.0), FILL);
        canvas.pointer_up();
        assert!(canvas.shapes().is_empty());

        // A freedraw click still leaves a dot.
        canvas.pointer_down(Pos2::new(10.0, 10.0), DrawingMode::FreeDraw, pen(4.0), FILL);
        canvas.pointer_up();
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_transform_moves_topmost_shape() {
        let mut canvas = Canvas::new(100, 100, BACKGROUND);
        drag(&mut canvas, DrawingMode::Rect, (10.0, 10.0), (50.0, 50.0));
        drag(&mut canvas, DrawingMode::Rect, (30.0, 30.0), (60.0, 60.0));

        canvas.pointer_down(Pos2::new(40.0, 40.0), DrawingMode::Transform, pen(4.0), FILL);
        assert_eq!(canvas.selected(), Some(1));
        canvas.pointer_moved(Pos2::new(60.0, 45.0));
        canvas.pointer_up();
        assert_eq!(canvas.selected(), None);

        assert_eq!(
            canvas.shapes()[1].bounds(),
            Rect::from_min_max(Pos2::new(50.0, 35.0), Pos2::new(80.0, 65.0))
        );
        // The shape underneath did not move.
        assert_eq!(
            canvas.shapes()[0].bounds(),
            Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0))
        );
    }

    #[test]
    fn test_transform_on_empty_space_does_nothing() {
        let mut canvas = Canvas::new(100, 100, BACKGROUND);
        drag(&mut canvas, DrawingMode::Line, (10.0, 10.0), (20.0, 10.0));
        let before = canvas.shapes().to_vec();

        drag(&mut canvas, DrawingMode::Transform, (80.0, 80.0), (90.0, 90.0));
        assert_eq!(canvas.shapes(), before.as_slice());
    }

    #[test]
    fn test_pointer_is_clamped_to_canvas() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        drag(&mut canvas, DrawingMode::Line, (-20.0, 10.0), (500.0, 10.0));

        match &canvas.shapes()[0] {
            Shape::Line { from, to, .. } => {
                assert_eq!(*from, Pos2::new(0.0, 10.0));
                assert_eq!(*to, Pos2::new(40.0, 10.0));
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_undo_and_clear() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        drag(&mut canvas, DrawingMode::Line, (5.0, 5.0), (30.0, 5.0));
        drag(&mut canvas, DrawingMode::Line, (5.0, 20.0), (30.0, 20.0));

        assert!(canvas.undo());
        assert_eq!(canvas.shapes().len(), 1);

        canvas.clear();
        assert!(canvas.is_blank());
        assert!(!canvas.undo());
    }

    #[test]
    fn test_redo_restores_undone_shapes() {
        let mut canvas = Canvas::new(40, 40, BACKGROUND);
        drag(&mut canvas, DrawingMode::Line, (5.0, 5.0), (30.0, 5.0));
        drag(&mut canvas, DrawingMode::Line, (5.0, 20.0), (30.0, 20.0));
        let drawn = canvas.shapes().to_vec();

        assert!(canvas.undo());
        assert!(canvas.undo());
        assert!(canvas.redo());
        assert!(canvas.redo());
        assert!(!canvas.redo());
        assert_eq!(canvas.shapes(), drawn.as_slice());

        // A new shape after undo drops the redo history.
        canvas.undo();
        drag(&mut canvas, DrawingMode::Line, (5.0, 30.0), (30.0, 30.0));
        assert!(!canvas.redo());
        assert_eq!(canvas.shapes().len(), 2);
    }

    #[test]
    fn test_background_image_is_stretched_and_drawn_first() {
        let mut canvas = Canvas::new(20, 20, BACKGROUND);
        canvas.set_background_image(Some(RgbaImage::from_pixel(5, 5, Rgba([255, 255, 255, 255]))));
        assert_eq!(canvas.background_image().map(|img| img.dimensions()), Some((20, 20)));

        drag(&mut canvas, DrawingMode::Line, (0.0, 10.0), (20.0, 10.0));
        let img = canvas.rasterize();
        assert_eq!(*img.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(10, 10), Rgba([0, 0, 0, 255]));

        canvas.clear();
        assert!(canvas.background_image().is_some());
    }

    #[test]
    fn test_background_is_always_opaque() {
        let mut canvas = Canvas::new(4, 4, Rgba([10, 20, 30, 0]));
        assert_eq!(canvas.background(), Rgba([10, 20, 30, 255]));
        canvas.set_background(Rgba([1, 2, 3, 128]));
        assert_eq!(*canvas.rasterize().get_pixel(0, 0), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_drawing_mode_parsing() {
        assert_eq!("Rect".parse::<DrawingMode>().unwrap(), DrawingMode::Rect);
        assert_eq!(" freedraw ".parse::<DrawingMode>().unwrap(), DrawingMode::FreeDraw);
        assert!(matches!(
            "polygon".parse::<DrawingMode>(),
            Err(LiveMnistError::InvalidSetting { .. })
        ));
        for mode in DrawingMode::ALL {
            assert_eq!(mode.to_string().parse::<DrawingMode>().unwrap(), mode);
        }
    }
}
