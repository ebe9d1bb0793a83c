//! Geometry analysis: table boundary, column splits and ruled-line corners.
//!
//! Everything here works on a binary "dark" mask of the page:
//!
//! ```text
//!  luma ──otsu──► dark mask ──row/col runs──► ruled lines ──► table boundary
//!                     │                            └────────► corners (debug)
//!                     └──x projection──► smoothed profile ──► column splits
//! ```
//!
//! None of the operations fail. Low-confidence results degrade to the full
//! image (table) or exact equal-width division (columns), and the caller
//! learns about it through the `*_fallback` flags on [`SheetLayout`].

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::GeometryParams;
use crate::raster::{Boundary, RasterImage};

// ── Dark mask ────────────────────────────────────────────────────────────────

/// Otsu's threshold over the luma histogram.
///
/// Pixels with luma `<= threshold` are dark. A uniform image yields `0`.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;
    let mut best = 0u8;
    let mut best_var = -1.0f64;
    for (t, &n) in hist.iter().enumerate() {
        weight_bg += n;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * n as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let var = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if var > best_var {
            best_var = var;
            best = t as u8;
        }
    }
    best
}

pub(crate) struct DarkMask {
    width: u32,
    height: u32,
    dark: Vec<bool>,
}

impl DarkMask {
    pub(crate) fn new(image: &RasterImage, params: &GeometryParams) -> Self {
        let gray = image.to_luma();
        let threshold = params
            .dark_threshold
            .unwrap_or_else(|| otsu_threshold(&gray));
        trace!(threshold, "dark mask threshold");
        let dark = gray.pixels().map(|p| p.0[0] <= threshold).collect();
        Self {
            width: gray.width(),
            height: gray.height(),
            dark,
        }
    }

    #[inline]
    fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.dark[(y * self.width + x) as usize]
    }

    fn is_dark_signed(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x <= u32::MAX as i64 && y <= u32::MAX as i64 && self.is_dark(x as u32, y as u32)
    }
}

/// Longest stretch of dark cells, bridging light gaps of at most `max_gap`.
fn longest_run(cells: impl Iterator<Item = bool>, max_gap: u32) -> u32 {
    let mut best = 0;
    let mut start: Option<u32> = None;
    let mut last_dark = 0u32;
    for (i, dark) in cells.enumerate() {
        if !dark {
            continue;
        }
        let i = i as u32;
        match start {
            Some(_) if i - last_dark - 1 <= max_gap => {}
            _ => start = Some(i),
        }
        last_dark = i;
        if let Some(s) = start {
            best = best.max(i - s + 1);
        }
    }
    best
}

/// Collapse runs of adjacent indices into their centres.
fn merge_adjacent(indices: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let mut iter = indices.iter().copied();
    let Some(mut first) = iter.next() else {
        return out;
    };
    let mut last = first;
    for i in iter {
        if i == last + 1 {
            last = i;
            continue;
        }
        out.push((first + last) / 2);
        first = i;
        last = i;
    }
    out.push((first + last) / 2);
    out
}

fn horizontal_lines(mask: &DarkMask, params: &GeometryParams) -> Vec<u32> {
    let min_len = (mask.width as f64 * params.line_length_fraction).ceil() as u32;
    let rows: Vec<u32> = (0..mask.height)
        .filter(|&y| longest_run((0..mask.width).map(|x| mask.is_dark(x, y)), params.max_line_gap) >= min_len.max(1))
        .collect();
    merge_adjacent(&rows)
}

fn vertical_lines(mask: &DarkMask, params: &GeometryParams) -> Vec<u32> {
    let min_len = (mask.height as f64 * params.line_length_fraction).ceil() as u32;
    let cols: Vec<u32> = (0..mask.width)
        .filter(|&x| longest_run((0..mask.height).map(|y| mask.is_dark(x, y)), params.max_line_gap) >= min_len.max(1))
        .collect();
    merge_adjacent(&cols)
}

// ── Table boundary ───────────────────────────────────────────────────────────

fn table_from_mask(mask: &DarkMask, params: &GeometryParams) -> Option<Boundary> {
    let rows = horizontal_lines(mask, params);
    let cols = vertical_lines(mask, params);
    trace!(rows = rows.len(), cols = cols.len(), "ruled lines");
    if rows.len() < 2 || cols.len() < 2 {
        return None;
    }
    let (x0, x1) = (*cols.first()?, *cols.last()?);
    let (y0, y1) = (*rows.first()?, *rows.last()?);
    let table = Boundary::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)?;

    let image_area = u64::from(mask.width) * u64::from(mask.height);
    let min_area = (image_area as f64 * params.min_table_area_fraction) as u64;
    if table.area() < min_area {
        trace!(area = table.area(), min_area, "table too small");
        return None;
    }
    Some(table)
}

/// Largest ruled-table region, or `None` when no confident one exists.
pub fn locate_table(image: &RasterImage, params: &GeometryParams) -> Option<Boundary> {
    let mask = DarkMask::new(image, params);
    table_from_mask(&mask, params)
}

/// Table region, falling back to the full image bounds on low confidence.
pub fn find_table_boundaries(image: &RasterImage, params: &GeometryParams) -> Boundary {
    locate_table(image, params).unwrap_or_else(|| image.bounds())
}

// ── Column splits ────────────────────────────────────────────────────────────

/// Interior column split x-coordinates, strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    splits: Vec<u32>,
}

impl ColumnSet {
    /// `None` unless `splits` is strictly increasing.
    pub fn new(splits: Vec<u32>) -> Option<Self> {
        splits
            .windows(2)
            .all(|w| w[0] < w[1])
            .then_some(Self { splits })
    }

    /// Exact equal-width division of `region` into `columns` columns.
    ///
    /// Splits stay strictly increasing even when `region` is narrower than
    /// `columns` pixels, in which case the last splits run past its edge.
    pub fn equal_division(region: Boundary, columns: usize) -> Self {
        let n = columns.max(1) as u64;
        let w = u64::from(region.width);
        let mut splits = Vec::with_capacity(columns.saturating_sub(1));
        let mut prev: Option<u32> = None;
        for i in 1..n {
            let offset = ((i * w + n / 2) / n) as u32;
            let mut x = region.x + offset;
            if let Some(p) = prev {
                x = x.max(p + 1);
            }
            splits.push(x);
            prev = Some(x);
        }
        Self { splits }
    }

    pub fn splits(&self) -> &[u32] {
        &self.splits
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Number of columns the splits produce.
    pub fn column_count(&self) -> usize {
        self.splits.len() + 1
    }
}

/// Column detection result plus whether equal division was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDetection {
    pub columns: ColumnSet,
    pub fallback: bool,
}

/// Detect `expected_columns - 1` column splits inside `search_region`.
///
/// See [`detect_columns_detailed`] for the algorithm.
pub fn detect_columns_automatically(
    image: &RasterImage,
    search_region: Option<Boundary>,
    use_heuristics: bool,
    expected_columns: usize,
    params: &GeometryParams,
) -> ColumnSet {
    detect_columns_detailed(image, search_region, use_heuristics, expected_columns, params).columns
}

/// Projection-profile column detection.
///
/// The dark-pixel density per x (vertical ruled lines counted as empty) is
/// box-smoothed, and one local minimum is picked per interior split from a
/// window of ±½ average column width around its equal-division position.
/// Minima must sit at or below `gap_confidence_ratio` × mean density and be
/// at least `min_gap_spacing_fraction` × average width from the previous
/// split. Near-equal minima are resolved towards the ideal position. If any
/// split finds no candidate, the whole set falls back to equal division.
pub fn detect_columns_detailed(
    image: &RasterImage,
    search_region: Option<Boundary>,
    use_heuristics: bool,
    expected_columns: usize,
    params: &GeometryParams,
) -> ColumnDetection {
    let mask = DarkMask::new(image, params);
    columns_from_mask(&mask, search_region, use_heuristics, expected_columns, params)
}

fn columns_from_mask(
    mask: &DarkMask,
    search_region: Option<Boundary>,
    use_heuristics: bool,
    expected_columns: usize,
    params: &GeometryParams,
) -> ColumnDetection {
    let columns = expected_columns.max(1);
    let region = search_region
        .and_then(|r| r.clamp_to(mask.width, mask.height))
        .filter(|r| r.width as usize >= columns)
        .unwrap_or_else(|| Boundary::full(mask.width, mask.height));
    let equal = || ColumnDetection {
        columns: ColumnSet::equal_division(region, columns),
        fallback: true,
    };

    if columns == 1 {
        return ColumnDetection {
            columns: ColumnSet { splits: Vec::new() },
            fallback: false,
        };
    }
    if !use_heuristics {
        return ColumnDetection {
            columns: ColumnSet::equal_division(region, columns),
            fallback: false,
        };
    }

    let profile = smooth(&projection_profile(mask, region, params), params, region, columns);
    let avg = region.width as f64 / columns as f64;
    let mean = profile.iter().sum::<f64>() / profile.len().max(1) as f64;
    let max = profile.iter().cloned().fold(0.0f64, f64::max);
    let confident_below = params.gap_confidence_ratio * mean;

    let minima: Vec<usize> = local_minima(&profile)
        .into_iter()
        .filter(|&i| profile[i] <= confident_below)
        .collect();
    trace!(?minima, mean, "profile minima");

    let min_spacing = params.min_gap_spacing_fraction * avg;
    let mut splits = Vec::with_capacity(columns - 1);
    let mut prev = 0.0f64;
    for k in 1..columns {
        let ideal = k as f64 * avg;
        let lo = ideal - avg / 2.0;
        let hi = ideal + avg / 2.0;
        let in_window: Vec<usize> = minima
            .iter()
            .copied()
            .filter(|&i| {
                let x = i as f64;
                x >= lo && x <= hi && x - prev >= min_spacing
            })
            .collect();
        let Some(lowest) = in_window
            .iter()
            .map(|&i| profile[i])
            .min_by(|a, b| a.total_cmp(b))
        else {
            debug!(slot = k, "no confident gap; using equal division");
            return equal();
        };
        let tie = lowest + params.tie_tolerance * max;
        let chosen = in_window
            .iter()
            .copied()
            .filter(|&i| profile[i] <= tie)
            .min_by(|&a, &b| (a as f64 - ideal).abs().total_cmp(&(b as f64 - ideal).abs()));
        let Some(chosen) = chosen else {
            return equal();
        };
        prev = chosen as f64;
        splits.push(region.x + chosen as u32);
    }

    match ColumnSet::new(splits) {
        Some(columns) => ColumnDetection {
            columns,
            fallback: false,
        },
        None => equal(),
    }
}

/// Dark-pixel density per x inside `region`; vertical ruled lines read as 0.
fn projection_profile(mask: &DarkMask, region: Boundary, params: &GeometryParams) -> Vec<f64> {
    let height = region.height.max(1);
    let min_line = (height as f64 * params.line_length_fraction).ceil() as u32;
    (region.x..region.right())
        .map(|x| {
            let cells = (region.y..region.bottom()).map(|y| mask.is_dark(x, y));
            if longest_run(cells.clone(), params.max_line_gap) >= min_line.max(1) {
                return 0.0;
            }
            cells.filter(|&d| d).count() as f64 / height as f64
        })
        .collect()
}

/// Box filter with an odd window, averaging only the in-range samples.
fn smooth(profile: &[f64], params: &GeometryParams, region: Boundary, columns: usize) -> Vec<f64> {
    let avg = region.width as f64 / columns as f64;
    let mut window = (params.smoothing_fraction * avg).round().max(1.0) as usize;
    if window % 2 == 0 {
        window += 1;
    }
    let half = window / 2;
    let n = profile.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            profile[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Centres of plateaus strictly lower than both neighbours. Plateaus that
/// touch either end of the profile are not minima.
fn local_minima(profile: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    let n = profile.len();
    let mut i = 1;
    while i + 1 < n {
        let mut j = i;
        while j + 1 < n && profile[j + 1] == profile[i] {
            j += 1;
        }
        if j + 1 < n && profile[i - 1] > profile[i] && profile[j + 1] > profile[i] {
            out.push((i + j) / 2);
        }
        i = j + 1;
    }
    out
}

// ── Corners ──────────────────────────────────────────────────────────────────

/// A structural table intersection. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CornerPoint {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerKind {
    /// Two perpendicular arms.
    Corner,
    /// Three arms.
    TJunction,
    /// All four arms.
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Arms {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Arms {
    fn count(&self) -> usize {
        [self.up, self.down, self.left, self.right]
            .iter()
            .filter(|&&a| a)
            .count()
    }

    fn kind(&self) -> Option<CornerKind> {
        let vertical = self.up || self.down;
        let horizontal = self.left || self.right;
        match self.count() {
            4 => Some(CornerKind::Cross),
            3 => Some(CornerKind::TJunction),
            2 if vertical && horizontal => Some(CornerKind::Corner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerInfo {
    pub point: CornerPoint,
    pub kind: CornerKind,
    pub arms: Arms,
}

/// Whether `len` consecutive pixels from `(x, y)` along `(dx, dy)` are dark,
/// tolerating one pixel of drift perpendicular to the arm.
fn arm_inked(mask: &DarkMask, x: u32, y: u32, dx: i64, dy: i64, len: u32) -> bool {
    (1..=i64::from(len)).all(|step| {
        let cx = i64::from(x) + dx * step;
        let cy = i64::from(y) + dy * step;
        (-1..=1).any(|d| {
            if dx == 0 {
                mask.is_dark_signed(cx + d, cy)
            } else {
                mask.is_dark_signed(cx, cy + d)
            }
        })
    })
}

fn corners_from_mask(mask: &DarkMask, params: &GeometryParams) -> Vec<CornerInfo> {
    let rows = horizontal_lines(mask, params);
    let cols = vertical_lines(mask, params);
    let len = params.corner_arm_length.max(1);
    let mut out = Vec::new();
    for &y in &rows {
        for &x in &cols {
            let centre_dark = (-1..=1i64).any(|dx| {
                (-1..=1i64).any(|dy| mask.is_dark_signed(i64::from(x) + dx, i64::from(y) + dy))
            });
            if !centre_dark {
                continue;
            }
            let arms = Arms {
                up: arm_inked(mask, x, y, 0, -1, len),
                down: arm_inked(mask, x, y, 0, 1, len),
                left: arm_inked(mask, x, y, -1, 0, len),
                right: arm_inked(mask, x, y, 1, 0, len),
            };
            if let Some(kind) = arms.kind() {
                out.push(CornerInfo {
                    point: CornerPoint { x, y },
                    kind,
                    arms,
                });
            }
        }
    }
    trace!(corners = out.len(), "corner scan");
    out
}

/// Structural intersections with their classification.
pub fn detailed_corner_info(image: &RasterImage, params: &GeometryParams) -> Vec<CornerInfo> {
    let mask = DarkMask::new(image, params);
    corners_from_mask(&mask, params)
}

/// Structural intersection points.
pub fn detected_corners(image: &RasterImage, params: &GeometryParams) -> Vec<CornerPoint> {
    detailed_corner_info(image, params)
        .into_iter()
        .map(|c| c.point)
        .collect()
}

// ── Page layout ──────────────────────────────────────────────────────────────

/// What [`SheetLayout::analyze`] should do for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub expected_columns: usize,
    pub auto_crop: bool,
    pub use_heuristics: bool,
    /// Also collect corner diagnostics.
    pub corners: bool,
}

/// Geometry of one scoresheet page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub table: Boundary,
    /// Table detection was not confident; `table` is the full image.
    pub table_fallback: bool,
    pub columns: ColumnSet,
    /// Column detection was not confident; `columns` is equal division.
    pub columns_fallback: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corners: Vec<CornerInfo>,
}

impl SheetLayout {
    pub fn analyze(image: &RasterImage, params: &GeometryParams, options: LayoutOptions) -> Self {
        let mask = DarkMask::new(image, params);
        let (table, table_fallback) = if options.auto_crop {
            match table_from_mask(&mask, params) {
                Some(t) => (t, false),
                None => (image.bounds(), true),
            }
        } else {
            (image.bounds(), false)
        };

        let detection = columns_from_mask(
            &mask,
            Some(table),
            options.use_heuristics,
            options.expected_columns,
            params,
        );
        let corners = if options.corners {
            corners_from_mask(&mask, params)
        } else {
            Vec::new()
        };

        debug!(
            %table,
            table_fallback,
            splits = ?detection.columns.splits(),
            columns_fallback = detection.fallback,
            "page layout"
        );
        Self {
            table,
            table_fallback,
            columns: detection.columns,
            columns_fallback: detection.fallback,
            corners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const WHITE: Luma<u8> = Luma([255]);
    const BLACK: Luma<u8> = Luma([0]);

    /// Text-like blocks in 10-row bands, blank at each `gap` (11 px wide).
    fn columns_image(width: u32, height: u32, gaps: &[u32]) -> RasterImage {
        let mut img = GrayImage::from_pixel(width, height, WHITE);
        for y in 0..height {
            if y % 20 >= 10 {
                continue;
            }
            for x in 2..width - 2 {
                if gaps.iter().any(|&g| x + 5 >= g && x <= g + 5) {
                    continue;
                }
                img.put_pixel(x, y, BLACK);
            }
        }
        RasterImage::from(img)
    }

    /// 2-px ruled grid on a white page.
    fn grid_image() -> RasterImage {
        let mut img = GrayImage::from_pixel(400, 300, WHITE);
        for &x in &[40u32, 140, 240, 360] {
            for y in 30..=271 {
                img.put_pixel(x, y, BLACK);
                img.put_pixel(x + 1, y, BLACK);
            }
        }
        for &y in &[30u32, 100, 170, 270] {
            for x in 40..=361 {
                img.put_pixel(x, y, BLACK);
                img.put_pixel(x, y + 1, BLACK);
            }
        }
        RasterImage::from(img)
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([200]));
        for x in 0..5 {
            for y in 0..10 {
                img.put_pixel(x, y, Luma([20]));
            }
        }
        let t = otsu_threshold(&img);
        assert!((20..200).contains(&t), "threshold {t}");
        assert_eq!(otsu_threshold(&GrayImage::from_pixel(4, 4, WHITE)), 0);
    }

    #[test]
    fn longest_run_bridges_small_gaps() {
        let cells = [true, true, false, false, true, false, false, false, false, false, true];
        assert_eq!(longest_run(cells.iter().copied(), 2), 5);
        assert_eq!(longest_run(cells.iter().copied(), 0), 2);
        assert_eq!(longest_run(std::iter::empty(), 3), 0);
    }

    #[test]
    fn ruled_grid_gives_table_boundary() {
        let params = GeometryParams::default();
        let table = locate_table(&grid_image(), &params).expect("grid is a table");
        assert_eq!(table.x, 40);
        assert_eq!(table.y, 30);
        assert!((table.right() as i64 - 361).abs() <= 1, "{table}");
        assert!((table.bottom() as i64 - 271).abs() <= 1, "{table}");
    }

    #[test]
    fn blank_page_falls_back_to_full_image() {
        let params = GeometryParams::default();
        let img = RasterImage::from(GrayImage::from_pixel(120, 80, WHITE));
        assert!(locate_table(&img, &params).is_none());
        assert_eq!(find_table_boundaries(&img, &params), img.bounds());
    }

    #[test]
    fn grid_corners_are_classified() {
        let params = GeometryParams::default();
        let corners = detailed_corner_info(&grid_image(), &params);
        let count = |k| corners.iter().filter(|c| c.kind == k).count();
        assert_eq!(corners.len(), 16);
        assert_eq!(count(CornerKind::Corner), 4);
        assert_eq!(count(CornerKind::TJunction), 8);
        assert_eq!(count(CornerKind::Cross), 4);
        assert!(detected_corners(&grid_image(), &params).contains(&CornerPoint { x: 40, y: 30 }));
    }

    #[test]
    fn detects_visible_gaps() {
        let params = GeometryParams::default();
        let img = columns_image(600, 200, &[140, 310, 445]);
        let det = detect_columns_detailed(&img, None, true, 4, &params);
        assert!(!det.fallback);
        let splits = det.columns.splits();
        assert_eq!(splits.len(), 3);
        for (got, want) in splits.iter().zip([140u32, 310, 445]) {
            assert!((*got as i64 - want as i64).abs() <= 3, "{splits:?}");
        }
    }

    #[test]
    fn partial_gaps_fall_back_to_equal_division() {
        let params = GeometryParams::default();
        let img = columns_image(600, 200, &[100, 200, 300]);
        let det = detect_columns_detailed(&img, None, true, 6, &params);
        assert!(det.fallback);
        assert_eq!(det.columns.splits(), &[100, 200, 300, 400, 500]);
    }

    #[test]
    fn heuristics_off_is_exact_division() {
        let params = GeometryParams::default();
        let img = columns_image(600, 200, &[140, 310, 445]);
        let cols = detect_columns_automatically(&img, None, false, 4, &params);
        assert_eq!(cols.splits(), &[150, 300, 450]);
    }

    #[test]
    fn equal_division_respects_region_offset() {
        let region = Boundary::new(10, 0, 100, 5).unwrap();
        assert_eq!(ColumnSet::equal_division(region, 4).splits(), &[35, 60, 85]);
        let tiny = Boundary::new(0, 0, 2, 2).unwrap();
        let cols = ColumnSet::equal_division(tiny, 5);
        assert_eq!(cols.len(), 4);
        assert!(ColumnSet::new(cols.splits().to_vec()).is_some());
    }

    #[test]
    fn column_set_rejects_unordered_splits() {
        assert!(ColumnSet::new(vec![10, 10]).is_none());
        assert!(ColumnSet::new(vec![30, 10]).is_none());
        assert_eq!(ColumnSet::new(vec![5, 9]).unwrap().column_count(), 3);
    }

    #[test]
    fn layout_without_auto_crop_uses_full_page() {
        let params = GeometryParams::default();
        let img = grid_image();
        let layout = SheetLayout::analyze(
            &img,
            &params,
            LayoutOptions {
                expected_columns: 3,
                auto_crop: false,
                use_heuristics: false,
                corners: false,
            },
        );
        assert_eq!(layout.table, img.bounds());
        assert!(!layout.table_fallback);
        assert_eq!(layout.columns.len(), 2);
        assert!(layout.corners.is_empty());
    }

    #[test]
    fn layout_columns_match_standalone_detection() {
        let params = GeometryParams::default();
        for (img, expected) in [
            (columns_image(400, 200, &[100, 200, 300]), 4),
            (grid_image(), 3),
        ] {
            let layout = SheetLayout::analyze(
                &img,
                &params,
                LayoutOptions {
                    expected_columns: expected,
                    auto_crop: true,
                    use_heuristics: true,
                    corners: true,
                },
            );
            let alone = detect_columns_detailed(&img, Some(layout.table), true, expected, &params);
            assert_eq!(layout.columns, alone.columns);
            assert_eq!(layout.columns_fallback, alone.fallback);
        }
    }
}
