use ecolor::Hsva;
use eframe::egui::{self, pos2, vec2, Align2, Color32, FontId, Rect, Sense, Stroke, Ui};
use live_mnist::{Histogram, Probabilities};

/// Number of buckets in the histogram view, one per possible digit.
pub const HISTOGRAM_BINS: usize = 10;
const CHART_HEIGHT: f32 = 200.0;

/// How the probability vector is plotted after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// One bar per digit, height = probability.
    Bars,
    /// Distribution of the ten probability values.
    Histogram,
}

impl ChartKind {
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bars => "Per digit",
            ChartKind::Histogram => "Histogram",
        }
    }
}

/// Stable, well separated color for a digit.
pub fn digit_color(digit: usize) -> Color32 {
    let golden_ratio_conjugate = 0.618_034;
    let hue = (digit as f32 * golden_ratio_conjugate).fract();
    Color32::from(Hsva {
        h: hue,
        s: 0.75,
        v: 0.85,
        a: 1.0,
    })
}

/// Splits `plot` into equal slots and returns one bar per height.
/// Heights are fractions of the plot height and are clamped to `[0, 1]`.
pub fn bar_rects(plot: Rect, heights: &[f32]) -> Vec<Rect> {
    if heights.is_empty() {
        return Vec::new();
    }
    let slot = plot.width() / heights.len() as f32;
    let gap = slot * 0.15;

    heights
        .iter()
        .enumerate()
        .map(|(i, &h)| {
            let h = if h.is_finite() { h.clamp(0.0, 1.0) } else { 0.0 };
            let left = plot.left() + slot * i as f32 + gap;
            Rect::from_min_max(
                pos2(left, plot.bottom() - h * plot.height()),
                pos2(left + slot - 2.0 * gap, plot.bottom()),
            )
        })
        .collect()
}

/// Draws the probabilities of the last submission.
pub fn draw_probability_chart(ui: &mut Ui, probabilities: &Probabilities<f32>, kind: ChartKind) {
    let width = ui.available_width().clamp(240.0, 520.0);
    let (response, painter) = ui.allocate_painter(vec2(width, CHART_HEIGHT), Sense::hover());
    let frame = response.rect;
    let plot = Rect::from_min_max(frame.min + vec2(8.0, 18.0), frame.max - vec2(8.0, 20.0));
    let text_color = ui.visuals().text_color();
    let small = FontId::proportional(11.0);

    painter.line_segment(
        [plot.left_bottom(), plot.right_bottom()],
        Stroke::new(1.0, Color32::GRAY),
    );

    match kind {
        ChartKind::Bars => {
            let values = probabilities.to_vec();
            for (digit, (bar, p)) in bar_rects(plot, &values).into_iter().zip(&values).enumerate() {
                painter.rect_filled(bar, 0.0, digit_color(digit));
                painter.text(
                    pos2(bar.center().x, plot.bottom() + 2.0),
                    Align2::CENTER_TOP,
                    digit.to_string(),
                    small.clone(),
                    text_color,
                );
                if *p >= 0.005 {
                    painter.text(
                        pos2(bar.center().x, bar.top() - 2.0),
                        Align2::CENTER_BOTTOM,
                        format!("{:.2}", p),
                        small.clone(),
                        text_color,
                    );
                }
            }
        }
        ChartKind::Histogram => {
            let Some(histogram) = Histogram::new(&probabilities.to_vec(), HISTOGRAM_BINS) else {
                return;
            };
            let max = histogram.max_count().max(1) as f32;
            let heights: Vec<f32> = histogram.counts.iter().map(|&c| c as f32 / max).collect();
            let color = Color32::from_rgb(70, 130, 180);

            for (bar, &count) in bar_rects(plot, &heights).into_iter().zip(&histogram.counts) {
                painter.rect_filled(bar, 0.0, color);
                if count > 0 {
                    painter.text(
                        pos2(bar.center().x, bar.top() - 2.0),
                        Align2::CENTER_BOTTOM,
                        count.to_string(),
                        small.clone(),
                        text_color,
                    );
                }
            }
            let first = histogram.bin_range(0);
            let last = histogram.bin_range(histogram.bins() - 1);
            if let (Some((lo, _)), Some((_, hi))) = (first, last) {
                painter.text(
                    pos2(plot.left(), plot.bottom() + 2.0),
                    Align2::LEFT_TOP,
                    format!("{:.3}", lo),
                    small.clone(),
                    text_color,
                );
                painter.text(
                    pos2(plot.right(), plot.bottom() + 2.0),
                    Align2::RIGHT_TOP,
                    format!("{:.3}", hi),
                    small,
                    text_color,
                );
            }
        }
    }

    response.on_hover_text(match kind {
        ChartKind::Bars => "Probability of each digit",
        ChartKind::Histogram => "How many digits fall in each probability range",
    });
}

pub fn chart_kind_selector(ui: &mut Ui, kind: &mut ChartKind) {
    egui::ComboBox::from_label("Chart")
        .selected_text(kind.label())
        .show_ui(ui, |ui| {
            for option in [ChartKind::Bars, ChartKind::Histogram] {
                ui.selectable_value(kind, option, option.label());
            }
        });
}
