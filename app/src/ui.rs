use crate::app::{hex_label, LiveMnistApp, STROKE_WIDTH_RANGE};
use crate::canvas::{DrawingMode, Shape};
use crate::chart;

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use image::Rgba;
use live_mnist::Prediction;

/// Side of the on-screen preview of the model input.
const PREVIEW_SIDE: f32 = 112.0;

/// Draws the left-side panel with the pen and canvas controls.
pub fn draw_side_panel(app: &mut LiveMnistApp, ctx: &egui::Context) {
    egui::SidePanel::left("controls_panel").show(ctx, |ui| {
        ui.heading("Canvas");
        ui.separator();

        ui.add(
            egui::Slider::new(&mut app.stroke_width, STROKE_WIDTH_RANGE)
                .step_by(1.0)
                .text("Stroke width"),
        );
        ui.horizontal(|ui| {
            ui.label("Stroke color hex:");
            ui.color_edit_button_srgb(&mut app.stroke_color);
            ui.monospace(hex_label(app.stroke_color));
        });
        ui.horizontal(|ui| {
            ui.label("Background color hex:");
            if ui.color_edit_button_srgb(&mut app.background_color).changed() {
                app.sync_background_color();
            }
            ui.monospace(hex_label(app.background_color));
        });
        ui.separator();

        draw_background_image_controls(app, ui);
        ui.separator();

        egui::ComboBox::from_label("Drawing tool")
            .selected_text(app.drawing_mode.label())
            .show_ui(ui, |ui| {
                for mode in DrawingMode::ALL {
                    ui.selectable_value(&mut app.drawing_mode, mode, mode.label());
                }
            });
        chart::chart_kind_selector(ui, &mut app.chart_kind);
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Undo").clicked() {
                app.undo();
            }
            if ui.button("Redo").clicked() {
                app.redo();
            }
            if ui.button("Clear").clicked() {
                app.clear();
            }
        });
        ui.separator();

        ui.label(format!("Model: {}", app.classifier.name()));
    });
}

fn draw_background_image_controls(app: &mut LiveMnistApp, ui: &mut Ui) {
    ui.label("Background image (png, jpg):");
    ui.text_edit_singleline(&mut app.background_path);
    ui.horizontal(|ui| {
        if ui.button("Load").clicked() {
            app.load_background_image();
        }
        if app.canvas.background_image().is_some() && ui.button("Remove").clicked() {
            app.remove_background_image();
        }
    });
    if let Some(error) = &app.background_error {
        ui.colored_label(Color32::RED, error.as_str());
    }
}

/// Draws the central panel: the canvas, SUBMIT and the last result.
pub fn draw_central_panel(app: &mut LiveMnistApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading("LIVE MNIST");
            ui.label("Draw a digit, then press SUBMIT.");
            ui.add_space(4.0);

            draw_canvas(app, ui);
            ui.add_space(4.0);

            if ui.button("SUBMIT").clicked() {
                app.submit();
            }
            ui.separator();

            draw_results(app, ui);
        });
    });
}

fn draw_canvas(app: &mut LiveMnistApp, ui: &mut Ui) {
    if app.background_texture.is_none() {
        if let Some(image) = app.canvas.background_image() {
            let size = [image.width() as usize, image.height() as usize];
            let pixels = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
            app.background_texture =
                Some(ui.ctx().load_texture("background-image", pixels, egui::TextureOptions::LINEAR));
        }
    }

    let (width, height) = app.canvas.size();
    let (response, painter) = ui.allocate_painter(Vec2::new(width as f32, height as f32), Sense::drag());
    let rect = response.rect;
    let offset = rect.min.to_vec2();

    // --- Drawing Layers ---
    painter.rect_filled(rect, 0.0, color32(app.canvas.background()));
    if let Some(texture) = &app.background_texture {
        painter.image(
            texture.id(),
            rect,
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
    }
    for shape in app.canvas.shapes().iter().chain(app.canvas.active()) {
        paint_shape(&painter, shape, offset);
    }
    if let Some(shape) = app.canvas.selected().and_then(|i| app.canvas.shapes().get(i)) {
        let margin = shape.stroke().width / 2.0 + 2.0;
        let bounds = shape.bounds().expand(margin).translate(offset);
        painter.add(egui::Shape::closed_line(
            vec![bounds.left_top(), bounds.right_top(), bounds.right_bottom(), bounds.left_bottom()],
            Stroke::new(1.0, Color32::LIGHT_BLUE),
        ));
    }

    // --- Interaction ---
    if let Some(pointer) = response.interact_pointer_pos() {
        let local = pointer - offset;
        if response.drag_started() {
            let style = app.stroke_style();
            app.canvas
                .pointer_down(local, app.drawing_mode, style, app.fill_color);
        } else if response.dragged() {
            app.canvas.pointer_moved(local);
        }
    }
    if response.drag_stopped() {
        app.canvas.pointer_up();
    }
}

/// Mirrors what the rasterizer produces, so the screen matches what gets
/// submitted.
fn paint_shape(painter: &egui::Painter, shape: &Shape, offset: Vec2) {
    let stroke = shape.stroke();
    let color = color32(stroke.color);
    let pen = Stroke::new(stroke.width, color);
    let radius = stroke.width / 2.0;

    match shape {
        Shape::Path { points, .. } => {
            let points: Vec<Pos2> = points.iter().map(|p| *p + offset).collect();
            if points.len() > 1 {
                painter.add(egui::Shape::line(points.clone(), pen));
            }
            // Round caps, and the dot of a single click.
            for end in [points.first(), points.last()].into_iter().flatten() {
                painter.circle_filled(*end, radius, color);
            }
        }
        Shape::Line { from, to, .. } => {
            painter.line_segment([*from + offset, *to + offset], pen);
            painter.circle_filled(*from + offset, radius, color);
            painter.circle_filled(*to + offset, radius, color);
        }
        Shape::Rect { fill, .. } => {
            let r = shape.bounds().translate(offset);
            painter.add(egui::Shape::convex_polygon(
                vec![r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()],
                color32(*fill),
                pen,
            ));
        }
        Shape::Circle {
            center,
            radius: circle_radius,
            fill,
            ..
        } => {
            painter.circle(*center + offset, *circle_radius, color32(*fill), pen);
        }
    }
}

fn draw_results(app: &mut LiveMnistApp, ui: &mut Ui) {
    let prediction = match &app.last_submission {
        None => {
            ui.label("Nothing submitted yet.");
            return;
        }
        Some(Err(error)) => {
            ui.colored_label(Color32::RED, format!("Prediction failed: {}", error));
            return;
        }
        Some(Ok(prediction)) => prediction,
    };

    let (digit, confidence) = prediction.digit();
    ui.heading(format!("Prediction: {} ({:.1}%)", digit, confidence * 100.0));
    ui.monospace(prediction.probabilities.to_string());
    ui.add_space(4.0);

    chart::draw_probability_chart(ui, &prediction.probabilities, app.chart_kind);

    if app.input_preview.is_none() {
        app.input_preview = Some(preview_texture(ui.ctx(), prediction));
    }
    if let Some(texture) = &app.input_preview {
        ui.label("Model input (28x28):");
        ui.image((texture.id(), Vec2::splat(PREVIEW_SIDE)));
    }
}

/// Grayscale texture of what the network saw, white ink on black like MNIST.
fn preview_texture(ctx: &egui::Context, prediction: &Prediction) -> egui::TextureHandle {
    let (rows, cols) = prediction.input.dim();
    let gray: Vec<u8> = prediction
        .input
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let image = egui::ColorImage::from_gray([cols, rows], &gray);
    ctx.load_texture("model-input", image, egui::TextureOptions::NEAREST)
}

fn color32(color: Rgba<u8>) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}
