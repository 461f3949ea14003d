//! vitrine: headless GPU rendering of scientific point data.
//!
//! - Visuals own their GPU state and build it lazily on first paint.
//! - Shader programs are stitched together from WGSL snippet templates, so a
//!   visual's fixed vertex/fragment code composes with whatever coordinate
//!   transform it is given.
//! - Transforms map local data coordinates to normalized device coordinates
//!   on the CPU and emit the WGSL function that does the same on the GPU.
//! - Rendering is offscreen: acquire a [`Renderer`], draw into a
//!   [`RenderTarget`], read pixels back with [`Renderer::snapshot`].
//!
//! A minimal frame:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let renderer = pollster::block_on(vitrine::Renderer::new())?;
//! let target = vitrine::RenderTarget::new(&renderer.gfx.device, 640, 480);
//! let mut points = vitrine::PointsVisual::new();
//! points.set_positions(vec![[0.0, 0.0, 0.5], [0.25, 0.25, 0.5]]);
//! renderer.render(&target, &mut [&mut points])?;
//! let rgba = renderer.snapshot(&target)?;
//! # let _ = rgba;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod renderer;
pub mod shader;
pub mod target;
pub mod transform;
pub mod visual;

pub use context::GpuContext;
pub use renderer::{PaintContext, Renderer};
pub use shader::{ComposeError, Composer, Snippet};
pub use target::RenderTarget;
pub use transform::{
    AffineTransform, ChainTransform, LogTransform, NullTransform, PolarTransform, STTransform,
    Transform,
};
pub use visual::{points::PointsVisual, DrawPreset, Visual};
