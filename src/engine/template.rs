use crate::foundation::error::{CityPaperError, CityPaperResult};

const SUBDOMAINS: [char; 3] = ['a', 'b', 'c'];

/// Coordinates of one tile request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TileCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

/// Check that a template has the required placeholders and expands to an absolute URL.
pub(crate) fn validate(template: &str) -> CityPaperResult<()> {
    for key in ["{z}", "{x}", "{y}"] {
        if !template.contains(key) {
            return Err(CityPaperError::validation(format!(
                "tile url template is missing {key}: {template}"
            )));
        }
    }
    let sample = expand(template, TileCoord { z: 0, x: 0, y: 0 }, false);
    url::Url::parse(&sample).map_err(|e| {
        CityPaperError::validation(format!("tile url template does not form a url ({e}): {template}"))
    })?;
    Ok(())
}

/// Substitute tile coordinates into an XYZ template.
///
/// `{s}` rotates over `a`, `b`, `c` by tile position so neighbouring tiles spread over hosts.
/// `{r}` becomes `@2x` for retina requests and disappears otherwise.
pub(crate) fn expand(template: &str, tile: TileCoord, retina: bool) -> String {
    let sub = SUBDOMAINS[((tile.x + tile.y) % SUBDOMAINS.len() as u32) as usize];
    template
        .replace("{s}", sub.encode_utf8(&mut [0u8; 4]))
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{r}", if retina { "@2x" } else { "" })
}
