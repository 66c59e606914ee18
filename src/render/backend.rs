use resvg::tiny_skia::Pixmap;

use crate::foundation::math::unpremultiply_rgba8_in_place;

/// A composed wallpaper as RGBA8 pixels.
///
/// Frames leave the compositor premultiplied. The `premultiplied` flag makes this explicit at API
/// boundaries; encoders convert with [`FrameRGBA::into_straight`].
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            data: pixmap.take(),
            premultiplied: true,
        }
    }

    /// Convert to straight alpha in place of `self`.
    pub fn into_straight(mut self) -> Self {
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut self.data);
            self.premultiplied = false;
        }
        self
    }

    /// RGBA of one pixel, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// What a composition is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeMode {
    /// On-screen look: device bezel around the target and rounded corners.
    Preview,
    /// Export look: the capture target only, square corners.
    Capture,
}
