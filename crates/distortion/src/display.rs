use crate::render::{Context, Framebuffer, Quad, Target, Uniform, UniformValue};
use crate::shaders::Programs;

use glow::HasContext;
use std::rc::Rc;

/// Draws the content onto the canvas, displaced by the velocity field.
pub struct Compositor {
    context: Context,
    programs: Rc<Programs>,
    quad: Rc<Quad>,
    pub width: u32,
    pub height: u32,
}

impl Compositor {
    pub fn new(
        context: &Context,
        programs: &Rc<Programs>,
        quad: &Rc<Quad>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            context: Rc::clone(context),
            programs: Rc::clone(programs),
            quad: Rc::clone(quad),
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Nothing is drawn until the first capture has been uploaded.
    pub fn render(&self, content: Option<glow::Texture>, velocity: &Framebuffer, strength: f32) {
        let inputs = match display_inputs(content, velocity.texture) {
            Some(inputs) => inputs,
            None => return,
        };

        unsafe {
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context
                .viewport(0, 0, self.width as i32, self.height as i32);
            self.context.clear_color(0.0, 0.0, 0.0, 0.0);
            self.context.clear(glow::COLOR_BUFFER_BIT);

            self.context.enable(glow::BLEND);
            self.context
                .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }

        self.programs.display.set_uniform(&Uniform {
            name: "distortionStrength",
            value: UniformValue::Float(strength),
        });

        self.quad.draw(
            &self.programs.display,
            &inputs,
            Target::Canvas {
                width: self.width,
                height: self.height,
            },
        );

        unsafe {
            self.context.disable(glow::BLEND);
        }
    }
}

// The display pass samples the content on unit 0 and the velocity on unit 1.
// There is nothing to draw until the content exists.
fn display_inputs<T: Copy>(content: Option<T>, velocity: T) -> Option<[T; 2]> {
    content.map(|content| [content, velocity])
}
