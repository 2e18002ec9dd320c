use crate::font_store::FontStore;
use crate::renderer::{GlyphCache, Pixmap, RasterParams, render};
use crate::text::layout::{Align, MeasureText, TextLayout, WritingMode, layout};
use crate::text::markup::{FontRegistry, Segment, parse};
use crate::text::style::StyleState;

/// Texture upload collaborator. `upload` receives the previous handle so a
/// backend can reuse the allocation; `destroy` releases a handle for good.
pub trait TextureSink {
    type Handle;

    fn upload(&mut self, pixmap: &Pixmap, previous: Option<Self::Handle>) -> Self::Handle;
    fn destroy(&mut self, handle: Self::Handle);
}

/// One label's full rendering state: raw markup text, default style,
/// layout/paint knobs, and the derived layout, surface and texture.
///
/// All mutation goes through setters that compare, clamp, mark the right
/// dirty flag and fire the change notification. Derived state is rebuilt
/// lazily by [`TextSkin::get_texture`]; any number of mutations between two
/// pulls collapse into at most one reflow and one raster pass.
pub struct TextSkin<H> {
    text: String,
    defaults: StyleState,
    align: Align,
    mode: WritingMode,
    /// Raster density multiplier, clamped to `[0.25, 4]`.
    resolution: f32,
    antialias: bool,
    /// Alpha cutoff percent for antialias-off rendering, clamped to `[0, 100]`.
    threshold: f32,
    wrap_chars: usize,
    line_break_width: f32,

    segments: Vec<Segment>,
    layout: Option<TextLayout>,
    /// Geometry is stale. Implies `raster_dirty`.
    layout_dirty: bool,
    /// Pixels are stale.
    raster_dirty: bool,
    rendered_at_scale: f32,
    surface: Option<Pixmap>,
    texture: Option<H>,
    on_changed: Option<Box<dyn FnMut()>>,
}

impl<H> Default for TextSkin<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TextSkin<H> {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            defaults: StyleState::default(),
            align: Align::default(),
            mode: WritingMode::default(),
            resolution: 1.0,
            antialias: true,
            threshold: 50.0,
            wrap_chars: 0,
            line_break_width: 0.0,

            segments: Vec::new(),
            layout: None,
            layout_dirty: true,
            raster_dirty: true,
            rendered_at_scale: 1.0,
            surface: None,
            texture: None,
            on_changed: None,
        }
    }

    /// Registers the change notification callback. Fired after every
    /// effective mutation, fire-and-forget.
    pub fn set_on_changed(&mut self, callback: impl FnMut() + 'static) {
        self.on_changed = Some(Box::new(callback));
    }

    pub fn clear_on_changed(&mut self) {
        self.on_changed = None;
    }

    fn notify(&mut self) {
        if let Some(callback) = &mut self.on_changed {
            callback();
        }
    }

    fn mark_layout_dirty(&mut self) {
        self.layout_dirty = true;
        self.raster_dirty = true;
        self.notify();
    }

    fn mark_raster_dirty(&mut self) {
        self.raster_dirty = true;
        self.notify();
    }
}

/// section setters
impl<H> TextSkin<H> {
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.text != text {
            self.text = text;
            self.mark_layout_dirty();
        }
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        if self.defaults.color != color {
            self.defaults.color = color;
            self.mark_layout_dirty();
        }
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        let alpha = alpha.clamp(0.0, 100.0);
        if self.defaults.alpha != alpha {
            self.defaults.alpha = alpha;
            self.mark_layout_dirty();
        }
    }

    pub fn set_font(&mut self, family: impl Into<String>) {
        let family = family.into();
        if self.defaults.font_family != family {
            self.defaults.font_family = family;
            self.mark_layout_dirty();
        }
    }

    pub fn set_font_size(&mut self, size: f32) {
        if self.defaults.font_size != size {
            self.defaults.font_size = size;
            self.mark_layout_dirty();
        }
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        if self.defaults.spacing != spacing {
            self.defaults.spacing = spacing;
            self.mark_layout_dirty();
        }
    }

    pub fn set_thickness(&mut self, thickness: f32) {
        let thickness = thickness.max(1.0);
        if self.defaults.thickness != thickness {
            self.defaults.thickness = thickness;
            self.mark_layout_dirty();
        }
    }

    pub fn set_outline_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        if self.defaults.outline_color != color {
            self.defaults.outline_color = color;
            self.mark_layout_dirty();
        }
    }

    pub fn set_outline_width(&mut self, width: f32) {
        let width = width.max(0.0);
        if self.defaults.outline_width != width {
            self.defaults.outline_width = width;
            self.mark_layout_dirty();
        }
    }

    pub fn set_writing_mode(&mut self, mode: WritingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.mark_layout_dirty();
        }
    }

    pub fn set_wrap_chars(&mut self, max_chars: usize) {
        if self.wrap_chars != max_chars {
            self.wrap_chars = max_chars;
            self.mark_layout_dirty();
        }
    }

    pub fn set_line_break_width(&mut self, width: f32) {
        let width = if width.is_finite() { width } else { 0.0 };
        if self.line_break_width != width {
            self.line_break_width = width;
            self.mark_layout_dirty();
        }
    }

    /// Paint-only: alignment anchors the existing layout, no reflow needed.
    pub fn set_align(&mut self, align: Align) {
        if self.align != align {
            self.align = align;
            self.mark_raster_dirty();
        }
    }

    pub fn set_resolution(&mut self, resolution: f32) {
        let resolution = resolution.clamp(0.25, 4.0);
        if self.resolution != resolution {
            self.resolution = resolution;
            self.mark_raster_dirty();
        }
    }

    pub fn set_antialias(&mut self, antialias: bool) {
        if self.antialias != antialias {
            self.antialias = antialias;
            self.mark_raster_dirty();
        }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        let threshold = threshold.clamp(0.0, 100.0);
        if self.threshold != threshold {
            self.threshold = threshold;
            self.mark_raster_dirty();
        }
    }
}

/// section getters
impl<H> TextSkin<H> {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> &str {
        &self.defaults.color
    }

    pub fn alpha(&self) -> f32 {
        self.defaults.alpha
    }

    pub fn font(&self) -> &str {
        &self.defaults.font_family
    }

    pub fn font_size(&self) -> f32 {
        self.defaults.font_size
    }

    pub fn spacing(&self) -> f32 {
        self.defaults.spacing
    }

    pub fn thickness(&self) -> f32 {
        self.defaults.thickness
    }

    pub fn outline_color(&self) -> &str {
        &self.defaults.outline_color
    }

    pub fn outline_width(&self) -> f32 {
        self.defaults.outline_width
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn writing_mode(&self) -> WritingMode {
        self.mode
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn wrap_chars(&self) -> usize {
        self.wrap_chars
    }

    pub fn line_break_width(&self) -> f32 {
        self.line_break_width
    }

    pub fn defaults(&self) -> &StyleState {
        &self.defaults
    }

    pub fn layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub fn raster_dirty(&self) -> bool {
        self.raster_dirty
    }

    /// Last computed layout, if any reflow has happened yet.
    pub fn layout(&self) -> Option<&TextLayout> {
        self.layout.as_ref()
    }

    /// Last rendered surface, if any raster pass has happened yet.
    pub fn surface(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }
}

/// section derived-state pipeline
impl<H> TextSkin<H> {
    /// Re-parses and re-lays-out the text against the current defaults.
    ///
    /// Parsing happens here rather than in `set_text` because reset tags
    /// bake the defaults current at parse time; re-parsing on every reflow
    /// is what makes a default change reach tagged text on the next pull.
    pub fn reflow<F>(&mut self, fonts: &mut F)
    where
        F: MeasureText + FontRegistry,
    {
        self.segments = parse(&self.text, &self.defaults, Some(&*fonts as &dyn FontRegistry));
        let laid = layout(
            &self.segments,
            &self.defaults,
            self.mode,
            self.wrap_chars,
            self.line_break_width,
            fonts,
        );
        self.layout = Some(laid);
        self.layout_dirty = false;
    }

    /// Returns the texture for this skin at `requested_scale`, rebuilding
    /// only the stale stages. The requested scale is clamped to
    /// `[0.25, 10]`, then combined with the resolution setting into the
    /// device scale (clamped the same way).
    pub fn get_texture<S>(
        &mut self,
        requested_scale: f32,
        fonts: &mut FontStore,
        glyphs: &mut GlyphCache,
        sink: &mut S,
    ) -> Option<&H>
    where
        S: TextureSink<Handle = H>,
    {
        let scale = requested_scale.abs().clamp(0.25, 10.0);
        let device_scale = (scale * self.resolution).clamp(0.25, 10.0);

        if self.layout_dirty {
            self.reflow(fonts);
        }

        let stale =
            self.raster_dirty || device_scale != self.rendered_at_scale || self.texture.is_none();
        if stale && let Some(laid) = &self.layout {
            let params = RasterParams {
                layout: laid,
                defaults: &self.defaults,
                align: self.align,
                mode: self.mode,
                line_break_width: self.line_break_width,
                antialias: self.antialias,
                threshold: self.threshold,
            };
            let pixmap = render(&params, device_scale, fonts, glyphs);
            let handle = sink.upload(&pixmap, self.texture.take());
            self.surface = Some(pixmap);
            self.texture = Some(handle);
            self.rendered_at_scale = device_scale;
            self.raster_dirty = false;
        }

        self.texture.as_ref()
    }

    /// Destroys the texture and releases the surface. The skin stays usable;
    /// the next pull re-renders from scratch.
    pub fn dispose<S>(&mut self, sink: &mut S)
    where
        S: TextureSink<Handle = H>,
    {
        if let Some(handle) = self.texture.take() {
            sink.destroy(handle);
        }
        self.surface = None;
        self.raster_dirty = true;
    }

    /// Copy of the style and configuration only. The clone owns no raster
    /// state and renders independently on its first pull.
    pub fn clone_detached(&self) -> TextSkin<H> {
        TextSkin {
            text: self.text.clone(),
            defaults: self.defaults.clone(),
            align: self.align,
            mode: self.mode,
            resolution: self.resolution,
            antialias: self.antialias,
            threshold: self.threshold,
            wrap_chars: self.wrap_chars,
            line_break_width: self.line_break_width,

            segments: Vec::new(),
            layout: None,
            layout_dirty: true,
            raster_dirty: true,
            rendered_at_scale: 1.0,
            surface: None,
            texture: None,
            on_changed: None,
        }
    }
}
