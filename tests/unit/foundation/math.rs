use super::*;

#[test]
fn premultiply_roundtrip_is_stable_for_opaque_pixels() {
    let mut px = vec![10u8, 20, 30, 255, 200, 100, 50, 255];
    let before = px.clone();
    premultiply_rgba8_in_place(&mut px);
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(px, before);
}

#[test]
fn premultiply_half_alpha() {
    let mut px = vec![100u8, 50, 200, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        px,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
}

#[test]
fn unpremultiply_transparent_is_zeroed() {
    let mut px = vec![9u8, 9, 9, 0];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(px, vec![0, 0, 0, 0]);
}

#[test]
fn tone_filter_keeps_gray_and_alpha() {
    // Mid-gray is a fixed point of both grayscale and contrast around 0.5.
    let mut px = vec![128u8, 128, 128, 255];
    tone_filter_premul(&mut px, 1, 0.2, 1.1);
    assert!(px[..3].iter().all(|c| (i32::from(*c) - 128).abs() <= 1));
    assert_eq!(px[3], 255);
}

#[test]
fn tone_filter_pulls_saturated_color_toward_gray() {
    let mut px = vec![255u8, 0, 0, 255];
    tone_filter_premul(&mut px, 1, 1.0, 1.0);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
}

#[test]
fn round_corners_clears_corner_pixels_only() {
    let (w, h) = (40u32, 40u32);
    let mut buf = vec![255u8; (w * h * 4) as usize];
    round_corners_premul(&mut buf, w, h, 10.0);
    assert_eq!(buf[3], 0, "top-left corner pixel is cleared");
    let last = ((w * h - 1) * 4 + 3) as usize;
    assert_eq!(buf[last], 0, "bottom-right corner pixel is cleared");
    let center = (((h / 2) * w + w / 2) * 4 + 3) as usize;
    assert_eq!(buf[center], 255);
}

#[test]
fn zero_radius_is_noop() {
    let mut buf = vec![255u8; 16 * 16 * 4];
    round_corners_premul(&mut buf, 16, 16, 0.0);
    assert!(buf.iter().all(|&b| b == 255));
}
