use crate::render::{
    self, Context, DoubleFramebuffer, Framebuffer, GlDataType, PingPong, TextureOptions,
};

use glow::HasContext;
use std::rc::Rc;

/// How many components a field stores per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    Scalar,
    Vector,
}

/// The storage the simulation fields get on this GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// 16-bit floats. Keeps negative velocities and avoids banding.
    HalfFloat,
    /// 8 bits per channel. Values clamp to [0, 1].
    Byte,
}

impl Precision {
    pub fn negotiate(context: &Context) -> Self {
        let extensions = context.supported_extensions();
        Self::from_capabilities(
            context.version().is_embedded,
            extensions.contains("EXT_color_buffer_half_float")
                || extensions.contains("EXT_color_buffer_float"),
        )
    }

    // Desktop GL 3.x can always render to half floats. GLES and WebGL need an
    // extension for it.
    pub fn from_capabilities(is_embedded: bool, has_float_render_targets: bool) -> Self {
        if !is_embedded || has_float_render_targets {
            Precision::HalfFloat
        } else {
            Precision::Byte
        }
    }

    pub fn format(&self, channels: Channels) -> GlDataType {
        match (self, channels) {
            (Precision::HalfFloat, Channels::Scalar) => glow::R16F,
            (Precision::HalfFloat, Channels::Vector) => glow::RG16F,
            (Precision::Byte, _) => glow::RGBA8,
        }
    }
}

/// Allocates the render targets for the simulation fields.
pub struct FramebufferPool {
    context: Context,
    precision: Precision,
}

impl FramebufferPool {
    pub fn new(context: &Context) -> Self {
        let precision = Precision::negotiate(context);
        log::debug!("Simulation precision: {:?}", precision);

        Self {
            context: Rc::clone(context),
            precision,
        }
    }

    pub fn create_target(
        &self,
        width: u32,
        height: u32,
        channels: Channels,
    ) -> Result<Framebuffer, render::Problem> {
        let framebuffer =
            Framebuffer::new(&self.context, width, height, self.options(channels))?;
        framebuffer.zero_out();
        Ok(framebuffer)
    }

    pub fn create_double_target(
        &self,
        width: u32,
        height: u32,
        channels: Channels,
    ) -> Result<DoubleFramebuffer, render::Problem> {
        let front = self.create_target(width, height, channels)?;
        let back = self.create_target(width, height, channels)?;
        Ok(PingPong::new(front, back))
    }

    fn options(&self, channels: Channels) -> TextureOptions {
        TextureOptions {
            mag_filter: glow::LINEAR,
            min_filter: glow::LINEAR,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
            format: self.precision.format(channels),
        }
    }
}
