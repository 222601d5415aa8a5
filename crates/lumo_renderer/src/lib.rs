//! Lumo Renderer - offline CPU path tracing.
//!
//! A recursive path tracer over a Surface Area Heuristic BVH, driven by
//! low-discrepancy samplers so that every render is reproducible.
//!
//! A render is set up once with [`RenderInfo`] and then either run inline
//! with [`render`] or on a background thread with [`RenderWorker`].

pub mod bvh;
mod error;
pub mod integrator;
pub mod renderer;
pub mod sampler;
mod settings;
mod worker;

pub use bvh::{intersect_linear, Bvh, BvhNode, BvhStats, BvhTriangle, Hit};
pub use error::{RenderError, RenderResult};
pub use integrator::{Integrator, EMISSIVE_SCALE, RAY_EPSILON};
pub use renderer::{expose, render, render_pixel, to_rgb8, FrameBuffer, RenderInfo, RenderStats, CHANNELS};
pub use sampler::{PixelSampler, Sampler, SamplerKind, SamplerTables};
pub use settings::RenderSettings;
pub use worker::RenderWorker;
