//! Vignette, dot grid and label block, authored as SVG in logical units.
//!
//! Every label region has a fixed height computed from the surface size alone, so an empty or
//! placeholder name never moves the other lines.

use std::fmt::Write as _;

use crate::assets::svg_raster::escape_xml;
use crate::foundation::core::{Location, Size};
use crate::scene::model::{PlaceLabel, StyleSpec};

const FONT_STACK: &str = "Inter, Helvetica Neue, Helvetica, Arial, sans-serif";
const MONO_STACK: &str = "JetBrains Mono, Menlo, Consolas, monospace";

const SIDE_PADDING: f64 = 32.0;
const BOTTOM_OFFSET: f64 = 64.0;

const ACCENT_WIDTH: f64 = 48.0;
const ACCENT_HEIGHT: f64 = 2.0;
const ACCENT_GAP: f64 = 20.0;

pub(crate) const NAME_SIZE: f64 = 48.0;
pub(crate) const MIN_NAME_SIZE: f64 = 20.0;
const NAME_TRACKING: f64 = 0.1;

const COUNTRY_SIZE: f64 = 12.0;
const COUNTRY_GAP: f64 = 8.0;
const COUNTRY_TRACKING: f64 = 0.5;

const COORDS_SIZE: f64 = 9.0;
const COORDS_GAP: f64 = 24.0;

const DESC_SIZE: f64 = 11.0;
const DESC_LINE: f64 = 18.0;
const DESC_GAP: f64 = 32.0;
const DESC_RULE_PAD: f64 = 16.0;
pub(crate) const DESC_MAX_LINES: usize = 3;
const DESC_WIDTH_FRACTION: f64 = 0.85;

const GRID_STEP: f64 = 24.0;
const GRID_OPACITY: f64 = 0.03;

/// Vertical positions of the label block, independent of label content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LabelRegions {
    pub top: f64,
    pub accent_y: f64,
    pub name_top: f64,
    pub country_top: f64,
    pub coords_top: f64,
    pub rule_y: f64,
    pub desc_top: f64,
    pub bottom: f64,
}

impl LabelRegions {
    pub(crate) fn block_height() -> f64 {
        ACCENT_HEIGHT
            + ACCENT_GAP
            + NAME_SIZE
            + COUNTRY_GAP
            + COUNTRY_SIZE * 1.4
            + COORDS_GAP
            + COORDS_SIZE * 1.4
            + DESC_GAP
            + DESC_RULE_PAD
            + DESC_LINE * DESC_MAX_LINES as f64
    }

    pub(crate) fn for_size(size: Size) -> Self {
        let bottom = size.height - BOTTOM_OFFSET;
        let top = bottom - Self::block_height();
        let accent_y = top;
        let name_top = accent_y + ACCENT_HEIGHT + ACCENT_GAP;
        let country_top = name_top + NAME_SIZE + COUNTRY_GAP;
        let coords_top = country_top + COUNTRY_SIZE * 1.4 + COORDS_GAP;
        let rule_y = coords_top + COORDS_SIZE * 1.4 + DESC_GAP;
        let desc_top = rule_y + DESC_RULE_PAD;
        Self {
            top,
            accent_y,
            name_top,
            country_top,
            coords_top,
            rule_y,
            desc_top,
            bottom,
        }
    }
}

fn glyph_em(c: char) -> f64 {
    if c.is_whitespace() {
        0.3
    } else if u32::from(c) >= 0x2E80 {
        // CJK and other full-width scripts.
        1.0
    } else if c.is_uppercase() {
        0.7
    } else {
        0.56
    }
}

fn estimate_width(text: &str, font_size: f64, tracking_em: f64) -> f64 {
    text.chars()
        .map(|c| (glyph_em(c) + tracking_em) * font_size)
        .sum()
}

/// Font size for the display name so it fits `avail` logical units on one line.
pub(crate) fn fit_name_size(name: &str, avail: f64) -> f64 {
    let at_full = estimate_width(name, NAME_SIZE, NAME_TRACKING);
    if at_full <= avail || at_full <= 0.0 {
        return NAME_SIZE;
    }
    (NAME_SIZE * avail / at_full).max(MIN_NAME_SIZE)
}

/// Greedy word wrap to at most `max_lines`, ellipsizing the last line on overflow.
///
/// Runs without spaces (e.g. CJK text) are broken between characters.
pub(crate) fn wrap_lines(text: &str, font_size: f64, avail: f64, max_lines: usize) -> Vec<String> {
    let fits = |s: &str| estimate_width(s, font_size, 0.0) <= avail;

    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut overflow = false;

    'words: for word in text.split_whitespace() {
        let mut pieces = vec![word.to_owned()];
        if !fits(word) {
            pieces.clear();
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if !fits(&piece) && piece.chars().count() > 1 {
                    piece.pop();
                    pieces.push(std::mem::take(&mut piece));
                    piece.push(c);
                }
            }
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }

        for piece in pieces {
            let candidate = if cur.is_empty() {
                piece.clone()
            } else {
                format!("{cur} {piece}")
            };
            if fits(&candidate) {
                cur = candidate;
                continue;
            }
            if !cur.is_empty() {
                lines.push(std::mem::take(&mut cur));
            }
            if lines.len() == max_lines {
                overflow = true;
                break 'words;
            }
            cur = piece;
        }
    }
    if !cur.is_empty() {
        if lines.len() < max_lines {
            lines.push(cur);
        } else {
            overflow = true;
        }
    }

    if overflow && let Some(last) = lines.last_mut() {
        while !last.is_empty() && !fits(&format!("{last}\u{2026}")) {
            last.pop();
        }
        let trimmed = last.trim_end().to_owned();
        *last = format!("{trimmed}\u{2026}");
    }
    lines
}

/// Build the overlay SVG for a surface of `size` logical units.
pub(crate) fn overlay_svg(
    size: Size,
    style: &StyleSpec,
    label: &PlaceLabel,
    location: Location,
    show_labels: bool,
) -> String {
    let Size { width, height } = size;
    let mut svg = String::with_capacity(4096);

    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##
    );
    let _ = write!(
        svg,
        r##"<defs><linearGradient id="vignette" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="#000000" stop-opacity="0.2"/><stop offset="0.5" stop-color="#000000" stop-opacity="0"/><stop offset="1" stop-color="#000000" stop-opacity="0.4"/></linearGradient><pattern id="dots" width="{GRID_STEP}" height="{GRID_STEP}" patternUnits="userSpaceOnUse"><circle cx="1" cy="1" r="1" fill="#ffffff"/></pattern></defs>"##
    );
    let _ = write!(
        svg,
        r##"<rect width="{width}" height="{height}" fill="url(#vignette)"/><rect width="{width}" height="{height}" fill="url(#dots)" opacity="{GRID_OPACITY}"/>"##
    );

    if show_labels {
        write_label(&mut svg, size, style, label, location);
    }

    svg.push_str("</svg>");
    svg
}

/// The label block is centered horizontally on the surface.
fn write_label(svg: &mut String, size: Size, style: &StyleSpec, label: &PlaceLabel, location: Location) {
    let r = LabelRegions::for_size(size);
    let cx = size.width / 2.0;
    let avail = (size.width - 2.0 * SIDE_PADDING).max(1.0);
    let text = style.text_color.to_hex();
    let accent = label.accent_color;

    let _ = write!(
        svg,
        r##"<rect x="{ax:.2}" y="{y}" width="{ACCENT_WIDTH}" height="{ACCENT_HEIGHT}" fill="{fill}" opacity="{op:.3}"/>"##,
        ax = cx - ACCENT_WIDTH / 2.0,
        y = r.accent_y,
        fill = accent.to_hex(),
        op = 0.5 * f64::from(accent.opacity()),
    );

    if !label.display_name.trim().is_empty() {
        let name = label.display_name.trim();
        let fs = fit_name_size(name, avail);
        // Center the (possibly shrunk) cap height inside the fixed name region.
        let baseline = r.name_top + (NAME_SIZE + fs * 0.72) / 2.0;
        let opacity = if label.is_resolving() { 0.5 } else { 1.0 };
        let _ = write!(
            svg,
            r##"<text x="{cx:.2}" y="{baseline:.2}" text-anchor="middle" font-family="{FONT_STACK}" font-size="{fs:.2}" font-weight="800" letter-spacing="{ls:.2}" fill="{text}" opacity="{opacity}">{}</text>"##,
            escape_xml(name),
            ls = fs * NAME_TRACKING,
        );
    }

    if !label.country_or_region.trim().is_empty() {
        let _ = write!(
            svg,
            r##"<text x="{cx:.2}" y="{y:.2}" text-anchor="middle" font-family="{FONT_STACK}" font-size="{COUNTRY_SIZE}" font-weight="700" letter-spacing="{ls}" fill="{text}" opacity="0.5">{}</text>"##,
            escape_xml(&label.country_or_region.trim().to_uppercase()),
            y = r.country_top + COUNTRY_SIZE,
            ls = COUNTRY_SIZE * COUNTRY_TRACKING,
        );
    }

    let _ = write!(
        svg,
        r##"<text x="{cx:.2}" y="{y:.2}" text-anchor="middle" font-family="{MONO_STACK}" font-size="{COORDS_SIZE}" fill="{text}" opacity="0.3">{}</text>"##,
        escape_xml(&location.coordinate_line()),
        y = r.coords_top + COORDS_SIZE,
    );

    let desc_avail = avail * DESC_WIDTH_FRACTION;
    let _ = write!(
        svg,
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{text}" stroke-opacity="0.1" stroke-width="1"/>"##,
        y = r.rule_y,
        x1 = cx - desc_avail / 2.0,
        x2 = cx + desc_avail / 2.0,
    );
    for (i, line) in wrap_lines(&label.description, DESC_SIZE, desc_avail, DESC_MAX_LINES)
        .iter()
        .enumerate()
    {
        let _ = write!(
            svg,
            r##"<text x="{cx:.2}" y="{y:.2}" text-anchor="middle" font-family="{FONT_STACK}" font-size="{DESC_SIZE}" font-weight="300" fill="{text}" opacity="0.8">{}</text>"##,
            escape_xml(line),
            y = r.desc_top + DESC_SIZE + DESC_LINE * i as f64,
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
