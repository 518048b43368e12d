use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use tracing::debug;

use crate::error::{AnnotationError, Result};

use super::{ViewModel, Viewer};

const DRAFT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

fn label_palette() -> [Rgb<u8>; 8] {
    [
        Rgb([255, 64, 64]),
        Rgb([64, 255, 64]),
        Rgb([64, 64, 255]),
        Rgb([255, 255, 64]),
        Rgb([255, 64, 255]),
        Rgb([64, 255, 255]),
        Rgb([255, 160, 64]),
        Rgb([255, 255, 255]),
    ]
}

fn named_color(name: &str) -> Rgb<u8> {
    match name {
        "red" => Rgb([255, 0, 0]),
        "blue" => Rgb([0, 0, 255]),
        "yellow" => Rgb([255, 255, 0]),
        "white" => Rgb([255, 255, 255]),
        "black" => Rgb([0, 0, 0]),
        _ => Rgb([0, 255, 0]),
    }
}

fn blend(base: Rgb<u8>, over: Rgb<u8>, opacity: f32) -> Rgb<u8> {
    Rgb(std::array::from_fn(|c| {
        (base[c] as f32 * (1.0 - opacity) + over[c] as f32 * opacity).round() as u8
    }))
}

/// Headless viewer that renders every presented state into a PNG file.
///
/// Draws the label map, the current draft and the box outlines. The instance
/// text in [`DisplayGeometry::labels`](crate::display::DisplayGeometry::labels)
/// is not drawn.
#[derive(Debug, Clone)]
pub struct PreviewViewer {
    output: PathBuf,
    opacity: f32,
    frames: usize,
}

impl PreviewViewer {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            opacity: 0.5,
            frames: 0,
        }
    }

    /// Opacity of the label and draft overlays, clamped to `0.0..=1.0`
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Number of states rendered so far
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Viewer for PreviewViewer {
    fn present(&mut self, view: &ViewModel<'_>) -> Result<()> {
        let canvas = render(view, self.opacity);
        canvas.save(&self.output).map_err(|source| AnnotationError::ImageSave {
            path: self.output.clone(),
            source,
        })?;
        self.frames += 1;
        debug!(output = %self.output.display(), frame = self.frames, "Rendered preview");
        Ok(())
    }
}

/// Compose the image with every visible layer.
///
/// Boxes reaching past the image are clipped to its border. Text labels are not drawn.
pub fn render(view: &ViewModel<'_>, opacity: f32) -> RgbImage {
    let mut canvas = view.image.clone();
    let palette = label_palette();

    if view.labels.visible {
        let labels = &view.labels.data;
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            if let Some(instance) = labels.instance_at(x, y) {
                *pixel = blend(*pixel, palette[instance % palette.len()], opacity);
            }
        }
    }

    if let Some(draft) = &view.draft {
        for (x, y) in draft.mask.foreground() {
            let pixel = canvas.get_pixel_mut(x, y);
            *pixel = blend(*pixel, DRAFT_COLOR, opacity);
        }
    }

    let (canvas_width, canvas_height) = canvas.dimensions();
    if view.boxes.visible && canvas_width > 0 && canvas_height > 0 {
        let geometry = &view.boxes.data;
        let color = named_color(&geometry.style.edge_color);
        let max_x = f64::from(canvas_width - 1);
        let max_y = f64::from(canvas_height - 1);
        let thickness = geometry
            .style
            .edge_width
            .clamp(1.0, canvas_width.max(canvas_height) as f32) as i32;

        for corners in &geometry.boxes {
            let [x0, y0] = [corners[0][0].clamp(0.0, max_x) as i32, corners[0][1].clamp(0.0, max_y) as i32];
            let [x1, y1] = [corners[2][0].clamp(0.0, max_x) as i32, corners[2][1].clamp(0.0, max_y) as i32];
            let width = (x1 - x0).max(0) + 1;
            let height = (y1 - y0).max(0) + 1;

            for t in 0..thickness {
                let rect = Rect::at(x0 - t, y0 - t).of_size((width + 2 * t) as u32, (height + 2 * t) as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
    }

    canvas
}
