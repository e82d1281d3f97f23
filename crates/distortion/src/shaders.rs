use crate::render::{self, Context, Program, Uniform, UniformValue};

static FLUID_VERT_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/fluid.vert"));
static SPLAT_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/splat.frag"));
static ADVECTION_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/advection.frag"));
static DIVERGENCE_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/divergence.frag"));
static SOLVE_PRESSURE_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/solve_pressure.frag"));
static SUBTRACT_GRADIENT_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/subtract_gradient.frag"));
static DISPLAY_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/display.frag"));

/// The binding point of the `FluidUniforms` block.
pub const FLUID_UNIFORMS_BINDING: u32 = 0;

/// The six programs behind the effect. Built once, never recompiled.
pub struct Programs {
    pub splat: Program,
    pub advection: Program,
    pub divergence: Program,
    pub pressure: Program,
    pub subtract_gradient: Program,
    pub display: Program,
}

impl Programs {
    pub fn new(context: &Context) -> Result<Self, render::Problem> {
        let splat = build(context, "splat", SPLAT_FRAG_SHADER)?;
        let advection = build(context, "advection", ADVECTION_FRAG_SHADER)?;
        let divergence = build(context, "divergence", DIVERGENCE_FRAG_SHADER)?;
        let pressure = build(context, "pressure", SOLVE_PRESSURE_FRAG_SHADER)?;
        let subtract_gradient = build(context, "subtract gradient", SUBTRACT_GRADIENT_FRAG_SHADER)?;
        let display = build(context, "display", DISPLAY_FRAG_SHADER)?;

        for program in [&advection, &divergence, &pressure, &subtract_gradient] {
            program.set_uniform_block("FluidUniforms", FLUID_UNIFORMS_BINDING);
        }

        // Texture units are fixed per program. Draws bind their inputs in
        // this order.
        splat.set_uniform(&Uniform {
            name: "velocityTexture",
            value: UniformValue::Texture2D(0),
        });
        advection.set_uniform(&Uniform {
            name: "velocityTexture",
            value: UniformValue::Texture2D(0),
        });
        divergence.set_uniform(&Uniform {
            name: "velocityTexture",
            value: UniformValue::Texture2D(0),
        });
        pressure.set_uniforms(&[
            &Uniform {
                name: "pressureTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "divergenceTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);
        subtract_gradient.set_uniforms(&[
            &Uniform {
                name: "pressureTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "velocityTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);
        display.set_uniforms(&[
            &Uniform {
                name: "contentTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "velocityTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);

        Ok(Self {
            splat,
            advection,
            divergence,
            pressure,
            subtract_gradient,
            display,
        })
    }
}

fn build(context: &Context, name: &str, fragment_shader: &str) -> Result<Program, render::Problem> {
    Program::new(context, (FLUID_VERT_SHADER, fragment_shader)).map_err(|problem| {
        log::error!("Failed to build the {} program: {}", name, problem);
        problem
    })
}
