/// Shared async HTTP client and tile byte sources.
pub mod http;

pub use http::{BoxFuture, HttpClient, TileSource};
