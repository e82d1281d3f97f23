mod data;
mod display;
mod fluid;
mod pool;
mod shaders;

pub mod content;
pub mod effect;
pub mod pointer;
pub mod render;
pub mod scheduler;
pub mod settings;

pub use content::{CaptureTicket, ContentSink, ContentSurface, Delivery, Rasterizer};
pub use effect::{Distortion, Problem};
pub use pointer::normalize;
pub use scheduler::{Effect, FrameHost, Scheduler, State};
pub use settings::Settings;
