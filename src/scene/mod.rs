//! What a wallpaper shows: styles, labels, places and persisted inputs.

/// Styles and place labels.
pub mod model;
/// Query-string wallpaper inputs.
pub mod params;
/// Built-in places.
pub mod presets;
/// Place lookup by name.
pub mod search;
