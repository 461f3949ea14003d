//! Textual WGSL composition.
//!
//! A visual's vertex/fragment code is written as templates with `$hook`
//! placeholders; collaborators (transforms, mostly) provide [`Snippet`]s that
//! fill the hooks. [`Composer`] stitches everything into one WGSL module,
//! giving every generated function a module-unique name.

mod compose;
mod snippet;

pub use compose::{ComposeError, Composer};
pub use snippet::Snippet;

pub(crate) use snippet::placeholders;
