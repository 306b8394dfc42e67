//! Preview rendering for generated landing pages.
//!
//! Turns a job's generated HTML/CSS/JS into a standalone document and
//! embeds it in a sandboxed frame. The generated code is untrusted: the
//! default [`SandboxPolicy`] lets it run scripts but gives it an opaque
//! origin, so it cannot read the host page's cookies or storage and
//! cannot navigate the top-level window.

pub mod document;
pub mod renderer;
pub mod sandbox;

pub use document::{build_document, DocumentOptions, IMAGE_PLACEHOLDER};
pub use renderer::{Preview, PreviewFiles, PreviewRenderer};
pub use sandbox::{SandboxPolicy, Viewport};
