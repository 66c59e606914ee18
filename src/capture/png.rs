use image::ImageEncoder as _;
use image::codecs::png::PngEncoder;

use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::render::backend::FrameRGBA;

/// Encode a frame as straight-alpha RGBA PNG.
pub fn encode_png(frame: FrameRGBA) -> CityPaperResult<Vec<u8>> {
    let frame = frame.into_straight();
    let expected = (frame.width as usize) * (frame.height as usize) * 4;
    if frame.data.len() != expected {
        return Err(CityPaperError::validation(format!(
            "frame buffer has {} bytes, expected {expected}",
            frame.data.len()
        )));
    }

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| CityPaperError::Other(anyhow::anyhow!("encode png: {e}")))?;
    Ok(out)
}
