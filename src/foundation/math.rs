use rayon::prelude::*;

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Convert straight-alpha RGBA8 into premultiplied RGBA8 in place.
pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

/// Convert premultiplied RGBA8 back into straight alpha in place.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        match a {
            255 => {}
            0 => {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
            }
            _ => {
                for c in &mut px[..3] {
                    *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
}

/// Apply `grayscale(amount)` followed by `contrast(factor)` to premultiplied RGBA8.
///
/// Coefficients follow the CSS filter definitions. Rows are processed in parallel.
pub(crate) fn tone_filter_premul(rgba: &mut [u8], width: u32, grayscale: f32, contrast: f32) {
    let g = grayscale.clamp(0.0, 1.0);
    let inv = 1.0 - g;
    // CSS grayscale(g) color matrix.
    let m = [
        [0.2126 + 0.7874 * inv, 0.7152 - 0.7152 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 + 0.2848 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 - 0.7152 * inv, 0.0722 + 0.9278 * inv],
    ];
    let row_bytes = (width as usize) * 4;
    if row_bytes == 0 {
        return;
    }

    rgba.par_chunks_mut(row_bytes).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let a = f32::from(px[3]) / 255.0;
            if a <= 0.0 {
                continue;
            }
            let r = f32::from(px[0]) / 255.0 / a;
            let gc = f32::from(px[1]) / 255.0 / a;
            let b = f32::from(px[2]) / 255.0 / a;
            for (i, out) in px[..3].iter_mut().enumerate() {
                let v = m[i][0] * r + m[i][1] * gc + m[i][2] * b;
                let v = ((v - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
                *out = (v * a * 255.0).round() as u8;
            }
        }
    });
}

/// Clear everything outside a rounded rectangle of `radius` pixels, with 1px antialiasing.
///
/// A zero radius leaves the buffer untouched.
pub(crate) fn round_corners_premul(rgba: &mut [u8], width: u32, height: u32, radius: f32) {
    if radius <= 0.0 || width == 0 || height == 0 {
        return;
    }
    let r = radius.min(width as f32 / 2.0).min(height as f32 / 2.0);
    let span = r.ceil() as u32;

    for y in 0..span.min(height) {
        for x in 0..span.min(width) {
            let dx = (r - (x as f32 + 0.5)).max(0.0);
            let dy = (r - (y as f32 + 0.5)).max(0.0);
            let dist = (dx * dx + dy * dy).sqrt();
            let coverage = (r - dist + 0.5).clamp(0.0, 1.0);
            if coverage >= 1.0 {
                continue;
            }
            for (cx, cy) in [
                (x, y),
                (width - 1 - x, y),
                (x, height - 1 - y),
                (width - 1 - x, height - 1 - y),
            ] {
                let i = ((cy * width + cx) * 4) as usize;
                for c in &mut rgba[i..i + 4] {
                    *c = (f32::from(*c) * coverage).round() as u8;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
