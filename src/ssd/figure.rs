use crate::ssd::helpers::img_drawing::{
    draw_bb_to_img_with_color, draw_caption_to_img, draw_line_to_img,
};
use ab_glyph::FontArc;
use anyhow::Context;
use image::{DynamicImage, Rgba, RgbaImage};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub color: Rgba<u8>,
}

/// A box outline, (xmin, xmax, ymin, ymax)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    pub bbox: [f32; 4],
    pub color: Rgba<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub background: Rgba<u8>,
}

/// An image with everything drawn on top of it so far
pub struct Figure {
    pub canvas: RgbaImage,
    pub lines: Vec<Line>,
    pub patches: Vec<Patch>,
    pub captions: Vec<Caption>,
    font: Option<FontArc>,
}

impl Figure {
    pub fn new(image: &DynamicImage, font: Option<FontArc>) -> Figure {
        Figure {
            canvas: image.to_rgba8(),
            lines: vec![],
            patches: vec![],
            captions: vec![],
            font,
        }
    }

    pub fn add_line(&mut self, start: (f32, f32), end: (f32, f32), color: Rgba<u8>) {
        draw_line_to_img(&mut self.canvas, start, end, color);
        self.lines.push(Line { start, end, color });
    }

    pub fn add_patch(&mut self, bbox: [f32; 4], color: Rgba<u8>, line_width: u32) {
        draw_bb_to_img_with_color(&mut self.canvas, &bbox, color, line_width);
        self.patches.push(Patch { bbox, color });
    }

    pub fn add_caption(&mut self, x: f32, y: f32, text: &str, background: Rgba<u8>) {
        draw_caption_to_img(
            &mut self.canvas,
            x.round() as i32,
            y.round() as i32,
            text,
            background,
            self.font.as_ref(),
        );
        self.captions.push(Caption {
            x,
            y,
            text: text.to_string(),
            background,
        });
    }
}

/// Displays finished figures
pub trait Viewer {
    fn show(&mut self, figure: &Figure) -> anyhow::Result<()>;
}

/// "Shows" a figure by writing it to a png
pub struct PngViewer {
    pub out_path: PathBuf,
}

impl Viewer for PngViewer {
    fn show(&mut self, figure: &Figure) -> anyhow::Result<()> {
        figure
            .canvas
            .save(&self.out_path)
            .with_context(|| format!("Error saving figure to {}", self.out_path.display()))?;
        info!("Figure saved to {}", self.out_path.display());
        Ok(())
    }
}
