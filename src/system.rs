use std::path::PathBuf;

use parking_lot::Mutex;

use crate::{
    font_store::FontStore,
    registry::{EntityId, SkinRegistry},
    renderer::GlyphCache,
    skin::{TextSkin, TextureSink},
};

/// High-level entry point for the label rendering system.
///
/// Coordinates [`FontStore`], the shared [`GlyphCache`] and the
/// [`SkinRegistry`] behind one object. Use `Mutex` to allow shared mutable
/// access, which is common in UI frameworks.
///
/// The fields are public to allow direct access to the underlying storage
/// when necessary (e.g. to hold one lock across several operations).
pub struct TextSystem<H> {
    /// The underlying font store.
    pub fonts: Mutex<FontStore>,
    /// Glyph coverage cache shared by every skin.
    pub glyph_cache: Mutex<GlyphCache>,
    /// Per-entity skins.
    pub skins: Mutex<SkinRegistry<H>>,
}

impl<H> Default for TextSystem<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TextSystem<H> {
    /// Creates a system with empty storage and the default cache pools.
    pub fn new() -> Self {
        Self::with_glyph_cache(GlyphCache::default())
    }

    /// Creates a system with a custom glyph cache configuration.
    pub fn with_glyph_cache(glyph_cache: GlyphCache) -> Self {
        Self {
            fonts: Mutex::new(FontStore::new()),
            glyph_cache: Mutex::new(glyph_cache),
            skins: Mutex::new(SkinRegistry::new()),
        }
    }
}

/// font store initialization
impl<H> TextSystem<H> {
    /// Loads the system fonts into the store.
    pub fn load_system_fonts(&self) {
        self.fonts.lock().load_system_fonts();
    }

    /// Loads a font from binary data.
    pub fn load_font_binary(&self, data: impl Into<Vec<u8>>) {
        self.fonts.lock().load_font_binary(data);
    }

    /// Loads a font from a file path.
    pub fn load_font_file(&self, path: PathBuf) -> Result<(), std::io::Error> {
        self.fonts.lock().load_font_file(path)
    }

    /// Loads all fonts from a directory.
    pub fn load_fonts_dir(&self, dir: PathBuf) {
        self.fonts.lock().load_fonts_dir(dir)
    }

    /// Sets the family name for the "serif" generic family.
    pub fn set_serif_family(&self, family: impl Into<String>) {
        self.fonts.lock().set_serif_family(family);
    }

    /// Sets the family name for the "sans-serif" generic family.
    pub fn set_sans_serif_family(&self, family: impl Into<String>) {
        self.fonts.lock().set_sans_serif_family(family);
    }

    /// Sets the family name for the "cursive" generic family.
    pub fn set_cursive_family(&self, family: impl Into<String>) {
        self.fonts.lock().set_cursive_family(family);
    }

    /// Sets the family name for the "fantasy" generic family.
    pub fn set_fantasy_family(&self, family: impl Into<String>) {
        self.fonts.lock().set_fantasy_family(family);
    }

    /// Sets the family name for the "monospace" generic family.
    pub fn set_monospace_family(&self, family: impl Into<String>) {
        self.fonts.lock().set_monospace_family(family);
    }
}

/// skin lifecycle
impl<H> TextSystem<H> {
    /// Runs `f` against the entity's skin, creating it on first use.
    pub fn with_skin<R>(&self, id: EntityId, f: impl FnOnce(&mut TextSkin<H>) -> R) -> R {
        f(self.skins.lock().get_or_create(id))
    }

    /// Pulls the entity's texture at the given scale, rebuilding whatever
    /// is stale. Creates the skin on first use.
    pub fn texture<S>(&self, id: EntityId, scale: f32, sink: &mut S) -> Option<H>
    where
        H: Clone,
        S: TextureSink<Handle = H>,
    {
        let mut fonts = self.fonts.lock();
        let mut glyph_cache = self.glyph_cache.lock();
        let mut skins = self.skins.lock();
        skins
            .get_or_create(id)
            .get_texture(scale, &mut fonts, &mut glyph_cache, sink)
            .cloned()
    }

    /// Host notification that an entity is gone. Disposes and drops its
    /// skin; returns whether one existed.
    pub fn entity_removed<S>(&self, id: EntityId, sink: &mut S) -> bool
    where
        S: TextureSink<Handle = H>,
    {
        self.skins.lock().remove(id, sink)
    }

    /// Host notification that an entity was cloned.
    pub fn clone_entity<S>(&self, source: EntityId, target: EntityId, sink: &mut S) -> bool
    where
        S: TextureSink<Handle = H>,
    {
        self.skins.lock().clone_entity(source, target, sink)
    }

    /// Drops every cached glyph coverage mask.
    pub fn clear_glyph_cache(&self) {
        self.glyph_cache.lock().clear();
    }
}
