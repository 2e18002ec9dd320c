use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::text::layout::MeasureText;
use crate::text::markup::{FontEntry, FontRegistry};

/// Manages font loading and retrieval using `fontdb` and `fontdue`.
///
/// Combines a database of available fonts (`fontdb`) with a cache of loaded
/// font instances (`fontdue`), plus a family-name resolution cache keyed by
/// the user-facing names the markup layer produces. Fonts are loaded lazily
/// on first use.
pub struct FontStore {
    /// This is the font set that has been loaded by fontdb.
    font_db: fontdb::Database,
    /// This is the font that has been loaded by fontdue.
    /// Not all fonts in fontdb are necessarily loaded here.
    loaded_font: HashMap<fontdb::ID, Arc<fontdue::Font>, fxhash::FxBuildHasher>,
    /// Resolution results per lowercased family name. `None` entries mark
    /// families that failed to resolve (and have already been warned about).
    family_cache: HashMap<String, Option<fontdb::ID>, fxhash::FxBuildHasher>,
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FontStore {
    /// Creates a new empty font store.
    pub fn new() -> Self {
        Self {
            font_db: fontdb::Database::new(),
            loaded_font: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
            family_cache: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }
}

/// Loading fonts into fontdb and setting up fontdb.
impl FontStore {
    /// Loads a font from binary data.
    pub fn load_font_binary(&mut self, data: impl Into<Vec<u8>>) {
        self.font_db.load_font_data(data.into());
        self.family_cache.clear();
    }

    /// Loads a font from a file path.
    pub fn load_font_file(&mut self, path: PathBuf) -> Result<(), std::io::Error> {
        let result = self.font_db.load_font_file(path);
        self.family_cache.clear();
        result
    }

    /// Loads all fonts from a directory.
    pub fn load_fonts_dir(&mut self, dir: PathBuf) {
        self.font_db.load_fonts_dir(dir);
        self.family_cache.clear();
    }

    /// Loads the system fonts.
    pub fn load_system_fonts(&mut self) {
        self.font_db.load_system_fonts();
        self.family_cache.clear();
    }

    /// Removes a face by ID.
    pub fn remove_face(&mut self, id: fontdb::ID) {
        self.font_db.remove_face(id);
        self.loaded_font.remove(&id);
        self.family_cache.clear();
    }

    /// Checks if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.font_db.is_empty()
    }

    /// Returns the number of available faces.
    pub fn len(&self) -> usize {
        self.font_db.len()
    }

    /// Sets the family name for the "serif" generic family.
    pub fn set_serif_family(&mut self, family: impl Into<String>) {
        self.font_db.set_serif_family(family);
        self.family_cache.clear();
    }

    /// Sets the family name for the "sans-serif" generic family.
    pub fn set_sans_serif_family(&mut self, family: impl Into<String>) {
        self.font_db.set_sans_serif_family(family);
        self.family_cache.clear();
    }

    /// Sets the family name for the "cursive" generic family.
    pub fn set_cursive_family(&mut self, family: impl Into<String>) {
        self.font_db.set_cursive_family(family);
        self.family_cache.clear();
    }

    /// Sets the family name for the "fantasy" generic family.
    pub fn set_fantasy_family(&mut self, family: impl Into<String>) {
        self.font_db.set_fantasy_family(family);
        self.family_cache.clear();
    }

    /// Sets the family name for the "monospace" generic family.
    pub fn set_monospace_family(&mut self, family: impl Into<String>) {
        self.font_db.set_monospace_family(family);
        self.family_cache.clear();
    }
}

/// Family resolution and `Font` retrieval.
impl FontStore {
    /// Maps the built-in display names to fontdb generic families; anything
    /// else queries by literal name.
    fn family_query(name: &str) -> fontdb::Family<'_> {
        if name.eq_ignore_ascii_case("Sans Serif") {
            fontdb::Family::SansSerif
        } else if name.eq_ignore_ascii_case("Serif") {
            fontdb::Family::Serif
        } else if name.eq_ignore_ascii_case("Handwriting") || name.eq_ignore_ascii_case("Curly") {
            fontdb::Family::Cursive
        } else if name.eq_ignore_ascii_case("Marker") || name.eq_ignore_ascii_case("Scratch") {
            fontdb::Family::Fantasy
        } else if name.eq_ignore_ascii_case("Pixel") {
            fontdb::Family::Monospace
        } else {
            fontdb::Family::Name(name)
        }
    }

    /// Resolves a family name to a face ID, caching the result. A family
    /// that fails to resolve is warned about once and remembered as absent
    /// until the database changes.
    pub fn resolve_family(&mut self, family: &str) -> Option<fontdb::ID> {
        let key = family.to_ascii_lowercase();
        if let Some(cached) = self.family_cache.get(&key) {
            return *cached;
        }

        let id = self.font_db.query(&fontdb::Query {
            families: &[Self::family_query(family), fontdb::Family::SansSerif],
            ..fontdb::Query::default()
        });
        if id.is_none() {
            log::warn!("No face found for font family {family:?}");
        }
        self.family_cache.insert(key, id);
        id
    }

    /// Retrieves a loaded font by ID, loading it if necessary.
    pub fn font(&mut self, id: fontdb::ID) -> Option<Arc<fontdue::Font>> {
        use std::collections::hash_map::Entry;

        match self.loaded_font.entry(id) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let font_result = self.font_db.with_face_data(id, |data, index| {
                    fontdue::Font::from_bytes(
                        data,
                        fontdue::FontSettings {
                            collection_index: index,
                            scale: 40.0,
                            load_substitutions: true,
                        },
                    )
                })?;

                match font_result {
                    Ok(font) => {
                        let r: &mut Arc<fontdue::Font> = entry.insert(Arc::new(font));
                        Some(Arc::clone(r))
                    }
                    Err(e) => {
                        log::error!("Failed to load font (id: {:?}): {}", id, e);
                        None
                    }
                }
            }
        }
    }

    /// Resolves a family name straight to its loaded font.
    pub fn font_for_family(&mut self, family: &str) -> Option<(fontdb::ID, Arc<fontdue::Font>)> {
        let id = self.resolve_family(family)?;
        self.font(id).map(|font| (id, font))
    }

    /// Returns an iterator over all available faces.
    pub fn faces(&self) -> impl Iterator<Item = &fontdb::FaceInfo> {
        self.font_db.faces()
    }

    /// Returns face info for an ID.
    pub fn face(&self, id: fontdb::ID) -> Option<&fontdb::FaceInfo> {
        self.font_db.face(id)
    }
}

impl MeasureText for FontStore {
    /// Sums fontdue advance widths. When no face resolves for the family,
    /// every character degrades to a `size / 2` advance so layout keeps a
    /// usable shape.
    fn measure(&mut self, family: &str, size: f32, text: &str) -> f32 {
        match self.font_for_family(family) {
            Some((_, font)) => text
                .chars()
                .map(|ch| font.metrics(ch, size).advance_width)
                .sum(),
            None => text.chars().count() as f32 * size * 0.5,
        }
    }
}

impl FontRegistry for FontStore {
    fn fonts(&self) -> Vec<FontEntry> {
        self.faces()
            .map(|face| FontEntry {
                name: face.post_script_name.clone(),
                family: face
                    .families
                    .first()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| face.post_script_name.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_reports_empty() {
        let store = FontStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.fonts().is_empty());
    }

    #[test]
    fn measurement_falls_back_without_fonts() {
        let mut store = FontStore::new();
        assert_eq!(store.measure("Sans Serif", 24.0, "ab"), 24.0);
        assert_eq!(store.measure("Sans Serif", 24.0, ""), 0.0);
    }

    #[test]
    fn failed_resolution_is_cached() {
        let mut store = FontStore::new();
        assert!(store.resolve_family("Nope").is_none());
        assert!(store.family_cache.contains_key("nope"));
        assert!(store.resolve_family("NOPE").is_none());
        assert_eq!(store.family_cache.len(), 1);
    }
}
