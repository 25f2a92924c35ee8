use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;

/// Caption box height and glyph width used when no font is available
const FALLBACK_CHAR_WIDTH: u32 = 6;
const FALLBACK_CAPTION_HEIGHT: u32 = 11;
pub const CAPTION_FONT_SIZE: f32 = 11.;

/// Draws an (xmin, xmax, ymin, ymax) box outline, `line_width` pixels thick, growing inwards
pub fn draw_bb_to_img_with_color(
    img: &mut RgbaImage,
    bb: &[f32; 4],
    rgba_color: Rgba<u8>,
    line_width: u32,
) {
    let left = bb[0].round() as i32;
    let top = bb[2].round() as i32;
    let width = (bb[1] - bb[0]).round().max(1.) as i32;
    let height = (bb[3] - bb[2]).round().max(1.) as i32;
    for inset in 0..line_width as i32 {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rec = Rect::at(left + inset, top + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rec, rgba_color);
    }
}

pub fn draw_line_to_img(
    img: &mut RgbaImage,
    start: (f32, f32),
    end: (f32, f32),
    rgba_color: Rgba<u8>,
) {
    draw_line_segment_mut(img, start, end, rgba_color);
}

/// Grid lines at the feature map cell boundaries, the first row and column included.
/// Cell size is the integer division of image by feature map size.
pub fn grid_lines(
    img_width: u32,
    img_height: u32,
    feature_height: u32,
    feature_width: u32,
) -> Vec<((f32, f32), (f32, f32))> {
    let mut lines = vec![];
    if feature_height == 0 || feature_width == 0 {
        return lines;
    }
    let grid_height = img_height / feature_height;
    for i in 0..feature_height {
        let y = (i * grid_height) as f32;
        lines.push(((0., y), (img_width as f32, y)));
    }
    let grid_width = img_width / feature_width;
    for i in 0..feature_width {
        let x = (i * grid_width) as f32;
        lines.push(((x, 0.), (x, img_height as f32)));
    }
    lines
}

/// Text on a filled box whose top left corner is at (x, y).
/// Without a font only the box is drawn.
pub fn draw_caption_to_img(
    img: &mut RgbaImage,
    x: i32,
    y: i32,
    text: &str,
    background: Rgba<u8>,
    font: Option<&FontArc>,
) {
    let scale = PxScale::from(CAPTION_FONT_SIZE);
    let (text_width, text_height) = match font {
        Some(font) => text_size(scale, font, text),
        None => (
            FALLBACK_CHAR_WIDTH * text.chars().count() as u32,
            FALLBACK_CAPTION_HEIGHT,
        ),
    };
    let rec = Rect::at(x, y).of_size(text_width.max(1) + 4, text_height.max(1) + 4);
    draw_filled_rect_mut(img, rec, background);
    if let Some(font) = font {
        draw_text_mut(img, Rgba([255, 255, 255, 255]), x + 2, y + 2, scale, font, text);
    }
}
