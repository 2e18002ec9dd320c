/// Inline markup parsing into the applied segment stream.
pub mod markup;
/// Style defaults, the state machine, and the styled character stream.
pub mod style;
/// Explicit and character-count line breaking.
pub mod wrap;
/// Fragmentation, measurement, and surface geometry.
pub mod layout;

pub use layout::{
    Align, Fragment, Line, MeasureText, TextLayout, WritingMode, layout,
};
pub use markup::{BUILTIN_FONTS, FontEntry, FontRegistry, Segment, parse, resolve_font_name};
pub use style::{StyleChange, StyleState, StyledChar, char_stream};
pub use wrap::{split_lines, wrap, wrap_segments};
