//! Column extraction: crop a page into per-column images.
//!
//! Also renders the review overlay: the page with its detected table,
//! column splits and corners drawn on top.

use image::Rgb;
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::warn;

use super::geometry::{ColumnSet, CornerKind, SheetLayout};
use crate::raster::{Boundary, RasterImage};

const TABLE_COLOUR: Rgb<u8> = Rgb([220, 30, 30]);
const SPLIT_COLOUR: Rgb<u8> = Rgb([30, 80, 220]);
const CORNER_COLOUR: Rgb<u8> = Rgb([20, 170, 60]);

/// Crop `image` to `boundary`, clamped to the image extents.
///
/// A boundary lying entirely outside the image yields the whole image.
pub fn crop_to_boundary(image: &RasterImage, boundary: Boundary) -> RasterImage {
    match boundary.clamp_to(image.width(), image.height()) {
        Some(b) if b == image.bounds() => image.clone(),
        Some(b) => RasterImage::new(image.as_dynamic().crop_imm(b.x, b.y, b.width, b.height)),
        None => {
            warn!(%boundary, "crop boundary outside image; using full image");
            image.clone()
        }
    }
}

/// One boundary per column, left to right, spanning the table height.
pub fn column_boundaries(table: Boundary, columns: &ColumnSet) -> Vec<Boundary> {
    let mut edges = Vec::with_capacity(columns.len() + 2);
    edges.push(table.x);
    edges.extend(
        columns
            .splits()
            .iter()
            .copied()
            .filter(|&x| x > table.x && x < table.right()),
    );
    edges.push(table.right());

    edges
        .windows(2)
        .filter_map(|w| Boundary::new(w[0], table.y, w[1] - w[0], table.height))
        .collect()
}

/// Crop every column of `layout` out of `image`.
pub fn extract_columns(image: &RasterImage, layout: &SheetLayout) -> Vec<RasterImage> {
    column_boundaries(layout.table, &layout.columns)
        .into_iter()
        .map(|b| crop_to_boundary(image, b))
        .collect()
}

/// Copy of `image` with the layout drawn on it, for human review.
pub fn create_image_with_boundaries(image: &RasterImage, layout: &SheetLayout) -> RasterImage {
    let mut canvas = image.to_rgb();
    let t = layout.table;

    for inset in 0..2u32 {
        if t.width > 2 * inset && t.height > 2 * inset {
            let rect = Rect::at((t.x + inset) as i32, (t.y + inset) as i32)
                .of_size(t.width - 2 * inset, t.height - 2 * inset);
            draw_hollow_rect_mut(&mut canvas, rect, TABLE_COLOUR);
        }
    }

    let (top, bottom) = (t.y as f32, t.bottom().saturating_sub(1) as f32);
    for &x in layout.columns.splits() {
        for dx in 0..2 {
            let x = (x + dx) as f32;
            draw_line_segment_mut(&mut canvas, (x, top), (x, bottom), SPLIT_COLOUR);
        }
    }

    for corner in &layout.corners {
        let arm = match corner.kind {
            CornerKind::Corner => 4.0,
            CornerKind::TJunction => 5.0,
            CornerKind::Cross => 6.0,
        };
        let (x, y) = (corner.point.x as f32, corner.point.y as f32);
        draw_line_segment_mut(&mut canvas, (x - arm, y), (x + arm, y), CORNER_COLOUR);
        draw_line_segment_mut(&mut canvas, (x, y - arm), (x, y + arm), CORNER_COLOUR);
        draw_cross_mut(&mut canvas, CORNER_COLOUR, corner.point.x as i32, corner.point.y as i32);
    }
    RasterImage::from(canvas)
}
