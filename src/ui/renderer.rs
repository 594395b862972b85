//! Note rendering with tiny-skia
//!
//! Layout and painting are separate: [`SceneLayout`] captures the geometry
//! of the host at one instant, [`NoteRenderer`] paints it into a pixmap.

use tiny_skia::{Color, Paint, Pixmap, Rect as SkiaRect, Transform};

use crate::app::host::NoteHost;
use crate::domain::core::Rect;

/// Rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("Failed to create pixmap for rendering")]
    PixmapCreationFailed,

    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidCanvasDimensions { width: i32, height: i32 },
}

/// Geometry of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// One square per live note, in creation order
    pub squares: Vec<SkiaRect>,
}

impl SceneLayout {
    /// Capture the host's notes against a canvas the size of `canvas`
    pub fn from_host(host: &NoteHost, canvas: Rect) -> Result<Self, RendererError> {
        if canvas.is_empty() {
            return Err(RendererError::InvalidCanvasDimensions {
                width: canvas.w,
                height: canvas.h,
            });
        }

        let squares = host
            .notes()
            .filter_map(|note| {
                let extent = note.extent();
                SkiaRect::from_xywh(
                    (extent.x - canvas.x) as f32,
                    (extent.y - canvas.y) as f32,
                    extent.w as f32,
                    extent.h as f32,
                )
            })
            .collect();

        Ok(Self {
            canvas_width: canvas.w as u32,
            canvas_height: canvas.h as u32,
            squares,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NoteRenderer {
    background: Color,
    note_color: Color,
}

impl NoteRenderer {
    pub fn new() -> Self {
        Self {
            background: Color::WHITE,
            note_color: Color::BLACK,
        }
    }

    /// Render a layout to a new pixmap
    pub fn render_layout(&self, layout: &SceneLayout) -> Result<Pixmap, RendererError> {
        let mut pixmap =
            Pixmap::new(layout.canvas_width, layout.canvas_height).ok_or(RendererError::PixmapCreationFailed)?;
        pixmap.fill(self.background);

        let mut paint = Paint::default();
        paint.set_color(self.note_color);
        for square in &layout.squares {
            // Squares partly outside the canvas are clipped by tiny-skia
            pixmap.fill_rect(*square, &paint, Transform::identity(), None);
        }

        Ok(pixmap)
    }

    /// Convert a pixmap to the BGRA byte order GDI expects for 32-bit DIBs
    pub fn pixmap_to_bgra(&self, pixmap: &Pixmap) -> Vec<u8> {
        let mut data = pixmap.data().to_vec();
        for pixel in data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
        data
    }
}

impl Default for NoteRenderer {
    fn default() -> Self {
        Self::new()
    }
}
