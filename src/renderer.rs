/// Fixed-block LRU glyph coverage cache.
pub mod glyph_cache;
/// RGBA surface and the layout painter.
pub mod raster;

pub use glyph_cache::{GlyphCache, GlyphCacheItem};
pub use raster::{Pixmap, RasterParams, Rgba, render};
