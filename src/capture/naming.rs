use crate::foundation::core::AspectRatioId;
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::scene::model::StyleId;

/// File name template for single exports.
pub const DEFAULT_SINGLE_TEMPLATE: &str = "citypaper-{name}-{style}-{ratio}.png";
/// File name template for batch items.
pub const DEFAULT_BATCH_TEMPLATE: &str = "citypaper-{index}-{name}-{style}-{ratio}.png";

/// Values substituted into a file name template.
#[derive(Clone, Copy, Debug)]
pub struct NameParts<'a> {
    /// Place name, slugged before substitution.
    pub name: &'a str,
    /// Active style.
    pub style: StyleId,
    /// Active aspect ratio.
    pub ratio: AspectRatioId,
    /// 1-based position in a batch.
    pub index: usize,
    /// Batch length.
    pub total: usize,
}

/// Lowercase, dash-separated form of a place name that is safe in file names.
///
/// Letters in any script are kept; everything else collapses into single dashes.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if dash && !out.is_empty() {
                out.push('-');
            }
            dash = false;
            out.extend(c.to_lowercase());
        } else {
            dash = true;
        }
    }
    if out.is_empty() {
        "place".to_owned()
    } else {
        out
    }
}

/// Expand `{name}`, `{style}`, `{ratio}`, `{index}` and `{total}` in `template`.
///
/// `{index}` is zero-padded to the width of `{total}` so batch files sort in order. The result
/// always ends in `.png` and never contains a path separator.
pub fn file_name(template: &str, parts: NameParts<'_>) -> CityPaperResult<String> {
    let width = parts.total.max(1).to_string().len();
    let mut name = template
        .replace("{name}", &slug(parts.name))
        .replace("{style}", parts.style.as_str())
        .replace("{ratio}", parts.ratio.file_tag())
        .replace("{index}", &format!("{:0width$}", parts.index))
        .replace("{total}", &parts.total.to_string());

    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(CityPaperError::validation(format!(
            "file name template must not produce paths: {name}"
        )));
    }
    if name.trim().is_empty() {
        return Err(CityPaperError::validation("file name template is empty"));
    }
    if !name.to_ascii_lowercase().ends_with(".png") {
        name.push_str(".png");
    }
    Ok(name)
}
