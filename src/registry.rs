use std::collections::HashMap;

use crate::skin::{TextSkin, TextureSink};

/// Stable identifier the host assigns to a label-bearing entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Owns one [`TextSkin`] per entity.
///
/// Skins are created on first use and live until the host reports the
/// entity gone; removal disposes the skin's texture through the sink, so
/// nothing leaks into the backend. Cloning an entity is an explicit
/// operation rather than something inferred from host internals.
pub struct SkinRegistry<H> {
    skins: HashMap<EntityId, TextSkin<H>, fxhash::FxBuildHasher>,
}

impl<H> Default for SkinRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SkinRegistry<H> {
    pub fn new() -> Self {
        Self {
            skins: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }

    pub fn get_or_create(&mut self, id: EntityId) -> &mut TextSkin<H> {
        self.skins.entry(id).or_insert_with(TextSkin::new)
    }

    pub fn get(&self, id: EntityId) -> Option<&TextSkin<H>> {
        self.skins.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut TextSkin<H>> {
        self.skins.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.skins.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    /// Removes an entity's skin, destroying its texture. Returns whether a
    /// skin existed.
    pub fn remove<S>(&mut self, id: EntityId, sink: &mut S) -> bool
    where
        S: TextureSink<Handle = H>,
    {
        match self.skins.remove(&id) {
            Some(mut skin) => {
                skin.dispose(sink);
                true
            }
            None => false,
        }
    }

    /// Copies `source`'s style onto `target` as a fresh detached skin. A
    /// skin already present at `target` is disposed first. Returns whether
    /// `source` existed.
    pub fn clone_entity<S>(&mut self, source: EntityId, target: EntityId, sink: &mut S) -> bool
    where
        S: TextureSink<Handle = H>,
    {
        let Some(copy) = self.skins.get(&source).map(TextSkin::clone_detached) else {
            return false;
        };
        if let Some(mut old) = self.skins.insert(target, copy) {
            old.dispose(sink);
        }
        true
    }

    /// Disposes every skin's texture and drops all skins.
    pub fn clear<S>(&mut self, sink: &mut S)
    where
        S: TextureSink<Handle = H>,
    {
        for (_, mut skin) in self.skins.drain() {
            skin.dispose(sink);
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Pixmap;

    #[derive(Default)]
    struct TestSink {
        uploads: usize,
        destroys: usize,
    }

    impl TextureSink for TestSink {
        type Handle = u32;

        fn upload(&mut self, _pixmap: &Pixmap, _previous: Option<u32>) -> u32 {
            self.uploads += 1;
            self.uploads as u32
        }

        fn destroy(&mut self, _handle: u32) {
            self.destroys += 1;
        }
    }

    fn render_once(registry: &mut SkinRegistry<u32>, id: EntityId, sink: &mut TestSink) {
        let mut fonts = crate::font_store::FontStore::new();
        let mut glyphs = crate::renderer::GlyphCache::default();
        registry
            .get_or_create(id)
            .get_texture(1.0, &mut fonts, &mut glyphs, sink);
    }

    #[test]
    fn creates_on_first_use() {
        let mut registry: SkinRegistry<u32> = SkinRegistry::new();
        assert!(!registry.contains(EntityId(1)));
        registry.get_or_create(EntityId(1)).set_text("a");
        assert!(registry.contains(EntityId(1)));
        assert_eq!(registry.len(), 1);
        // Same id returns the same skin.
        assert_eq!(registry.get_or_create(EntityId(1)).text(), "a");
    }

    #[test]
    fn remove_disposes_texture() {
        let mut registry: SkinRegistry<u32> = SkinRegistry::new();
        let mut sink = TestSink::default();
        render_once(&mut registry, EntityId(7), &mut sink);

        assert!(registry.remove(EntityId(7), &mut sink));
        assert_eq!(sink.destroys, 1);
        assert!(!registry.contains(EntityId(7)));
        assert!(!registry.remove(EntityId(7), &mut sink));
    }

    #[test]
    fn clone_entity_copies_style_into_fresh_skin() {
        let mut registry: SkinRegistry<u32> = SkinRegistry::new();
        let mut sink = TestSink::default();
        {
            let skin = registry.get_or_create(EntityId(1));
            skin.set_text("hello");
            skin.set_color("#abcdef");
        }

        assert!(registry.clone_entity(EntityId(1), EntityId(2), &mut sink));
        let copy = registry.get(EntityId(2)).unwrap();
        assert_eq!(copy.text(), "hello");
        assert_eq!(copy.color(), "#abcdef");
        assert!(copy.layout_dirty());

        assert!(!registry.clone_entity(EntityId(99), EntityId(3), &mut sink));
    }

    #[test]
    fn clone_over_existing_target_disposes_it() {
        let mut registry: SkinRegistry<u32> = SkinRegistry::new();
        let mut sink = TestSink::default();
        registry.get_or_create(EntityId(1)).set_text("src");
        render_once(&mut registry, EntityId(2), &mut sink);

        registry.clone_entity(EntityId(1), EntityId(2), &mut sink);
        assert_eq!(sink.destroys, 1);
        assert_eq!(registry.get(EntityId(2)).unwrap().text(), "src");
    }

    #[test]
    fn clear_disposes_everything() {
        let mut registry: SkinRegistry<u32> = SkinRegistry::new();
        let mut sink = TestSink::default();
        render_once(&mut registry, EntityId(1), &mut sink);
        render_once(&mut registry, EntityId(2), &mut sink);

        registry.clear(&mut sink);
        assert!(registry.is_empty());
        assert_eq!(sink.destroys, 2);
    }
}
