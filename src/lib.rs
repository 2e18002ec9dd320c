//! # Fude
//!
//! A rich-text rendering engine for 2D sprite labels.
//!
//! ## Overview
//!
//! `Fude` turns inline-markup strings (`<color="#ff0000">`, `</n>`, ...)
//! into laid-out, rasterized label textures. The core of the library is the
//! [`TextSystem`], which coordinates font loading, the per-entity
//! [`skin::TextSkin`] registry, and the shared glyph cache.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fude::{EntityId, TextSystem};
//!
//! // 1. Create a TextSystem (the texture handle type is yours)
//! let system: TextSystem<u32> = TextSystem::new();
//! system.load_system_fonts();
//!
//! // 2. Configure a label
//! system.with_skin(EntityId(1), |skin| {
//!     skin.set_text("<color=\"#ff0000\">Hello</n>world");
//!     skin.set_font_size(32.0);
//! });
//!
//! // 3. Pull its texture through your TextureSink implementation
//! // let handle = system.texture(EntityId(1), scale, &mut sink);
//! ```
//!
//! ## Features
//!
//! *   **Inline Markup**: Per-character color, font, size, spacing, alpha,
//!     thickness and outline changes with reset tags.
//! *   **Layout**: Character-count wrapping, horizontal and vertical
//!     writing modes, centerline-anchored alignment.
//! *   **Lazy Rendering**: Dirty-flag coalescing; any number of mutations
//!     cost one reflow and one raster pass on the next pull.
//! *   **Thread Safety**: Designed with internal locking for safe
//!     concurrent use.

pub mod font_store;
pub mod glyph_key;
pub mod registry;
pub mod renderer;
pub mod skin;
pub mod system;
pub mod text;

// common re-exports
pub use font_store::FontStore;
pub use glyph_key::GlyphKey;
pub use registry::{EntityId, SkinRegistry};
pub use renderer::{GlyphCache, Pixmap};
pub use skin::{TextSkin, TextureSink};
pub use system::TextSystem;

// re-export dependencies
pub use euclid;
pub use fontdb;
pub use fontdue;
pub use parking_lot;
