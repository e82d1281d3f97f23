use crate::content::{CaptureTicket, ContentSink, ContentTexture, Rasterizer};
use crate::display::Compositor;
use crate::fluid::Fluid;
use crate::pointer::Splat;
use crate::pool::FramebufferPool;
use crate::render::{self, Context, Quad};
use crate::scheduler::Effect;
use crate::settings::Settings;
use crate::shaders::Programs;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The fluid distortion over a single piece of content.
///
/// Owns every GPU resource of the effect. Dropping it releases them.
pub struct Distortion {
    settings: Rc<Settings>,

    fluid: Fluid,
    compositor: Compositor,
    content: Rc<RefCell<ContentTexture>>,
    rasterizer: Box<dyn Rasterizer>,
}

impl Distortion {
    pub fn new(
        context: &Context,
        settings: &Rc<Settings>,
        rasterizer: Box<dyn Rasterizer>,
    ) -> Result<Distortion, Problem> {
        log::info!(
            "Initialising the distortion (canvas: {0}x{0}, field: {1}x{1})",
            settings.canvas_size,
            settings.fluid_size
        );

        let programs = Rc::new(Programs::new(context)?);
        let quad = Rc::new(Quad::new(context, &programs.advection)?);
        let pool = FramebufferPool::new(context);

        let fluid = Fluid::new(context, settings, &programs, &quad, &pool)?;
        let compositor = Compositor::new(
            context,
            &programs,
            &quad,
            settings.canvas_size,
            settings.canvas_size,
        );

        Ok(Distortion {
            settings: Rc::clone(settings),
            fluid,
            compositor,
            content: Rc::new(RefCell::new(ContentTexture::new(context))),
            rasterizer,
        })
    }

    pub fn update(&mut self, settings: &Rc<Settings>) {
        self.settings = Rc::clone(settings);
        self.fluid.update(&self.settings);
        self.compositor
            .resize(settings.canvas_size, settings.canvas_size);
    }

    /// Resize the drawing surface, in physical pixels. The simulation grid
    /// keeps its size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.compositor.resize(width, height);
    }

    /// A sink that writes into this effect's content texture.
    pub fn content_sink(&self) -> ContentSink {
        ContentSink::new(&self.content)
    }
}

impl Effect for Distortion {
    fn capture(&mut self, ticket: CaptureTicket) {
        let sink = self.content_sink();
        self.rasterizer.rasterize(sink, ticket);
    }

    fn splat(&mut self, splat: &Splat) {
        self.fluid.splat(splat);
    }

    fn step(&mut self, timestep: f32) {
        self.fluid.step(timestep);
    }

    fn render(&mut self) {
        let content = self.content.borrow().texture();
        self.compositor.render(
            content,
            self.fluid.velocity(),
            self.settings.distortion_strength,
        );
    }
}

#[derive(Debug)]
pub enum Problem {
    CreateContext(String),
    ReadSettings(String),
    DecodeContent(image::ImageError),
    Render(render::Problem),
}

impl From<render::Problem> for Problem {
    fn from(problem: render::Problem) -> Self {
        Problem::Render(problem)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Problem::*;
        match self {
            CreateContext(msg) => write!(f, "Cannot create a rendering context: {}", msg),
            ReadSettings(msg) => write!(f, "Cannot read settings: {}", msg),
            DecodeContent(error) => write!(f, "Cannot decode content: {}", error),
            Render(render_msg) => write!(f, "{}", render_msg),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_problems_keep_their_message() {
        let problem: Problem = render::Problem::CannotLinkProgram("missing main".into()).into();
        assert_eq!(problem.to_string(), "Cannot link program: missing main");
    }

    #[test]
    fn undecodable_content_is_reported() {
        let error = match image::load_from_memory(b"not an image") {
            Err(error) => error,
            Ok(_) => panic!("decoded garbage"),
        };
        let problem = Problem::DecodeContent(error);
        assert!(problem.to_string().starts_with("Cannot decode content"));
    }
}
