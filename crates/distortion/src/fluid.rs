use crate::pointer::Splat;
use crate::pool::{Channels, FramebufferPool};
use crate::render::{
    self, Buffer, Context, DoubleFramebuffer, Framebuffer, Quad, Target, Uniform, UniformValue,
};
use crate::settings::Settings;
use crate::shaders::{Programs, FLUID_UNIFORMS_BINDING};

use crevice::std140::{AsStd140, Std140};
use glow::HasContext;
use std::rc::Rc;

// Jacobi weights for the pressure Poisson equation on a unit grid.
const PRESSURE_ALPHA: f32 = -1.0;
const PRESSURE_R_BETA: f32 = 0.25;

#[derive(Copy, Clone, Debug, AsStd140)]
struct FluidUniforms {
    timestep: f32,
    dissipation: f32,
    texel_size: mint::Vector2<f32>,
}

/// The velocity field and the passes that evolve it.
pub struct Fluid {
    context: Context,
    settings: Rc<Settings>,
    programs: Rc<Programs>,
    quad: Rc<Quad>,

    texel_size: [f32; 2],

    uniform_buffer: Buffer,

    velocity_textures: DoubleFramebuffer,
    divergence_texture: Framebuffer,
    pressure_textures: DoubleFramebuffer,
}

impl Fluid {
    pub fn new(
        context: &Context,
        settings: &Rc<Settings>,
        programs: &Rc<Programs>,
        quad: &Rc<Quad>,
        pool: &FramebufferPool,
    ) -> Result<Self, render::Problem> {
        let width = settings.fluid_size.max(1);
        let height = width;
        let texel_size = [1.0 / width as f32, 1.0 / height as f32];

        let velocity_textures = pool.create_double_target(width, height, Channels::Vector)?;
        let divergence_texture = pool.create_target(width, height, Channels::Scalar)?;
        let pressure_textures = pool.create_double_target(width, height, Channels::Scalar)?;

        let uniforms = FluidUniforms {
            timestep: 0.0,
            dissipation: settings.velocity_dissipation,
            texel_size: texel_size.into(),
        };
        let uniform_buffer = Buffer::from_bytes(
            context,
            uniforms.as_std140().as_bytes(),
            glow::UNIFORM_BUFFER,
            glow::DYNAMIC_DRAW,
        )?;

        programs.pressure.set_uniforms(&[
            &Uniform {
                name: "alpha",
                value: UniformValue::Float(PRESSURE_ALPHA),
            },
            &Uniform {
                name: "rBeta",
                value: UniformValue::Float(PRESSURE_R_BETA),
            },
        ]);

        Ok(Self {
            context: Rc::clone(context),
            settings: Rc::clone(settings),
            programs: Rc::clone(programs),
            quad: Rc::clone(quad),

            texel_size,

            uniform_buffer,

            velocity_textures,
            divergence_texture,
            pressure_textures,
        })
    }

    pub fn update(&mut self, settings: &Rc<Settings>) {
        self.settings = Rc::clone(settings);

        let uniforms = FluidUniforms {
            timestep: 0.0,
            dissipation: settings.velocity_dissipation,
            texel_size: self.texel_size.into(),
        };
        self.uniform_buffer
            .write_at(0, uniforms.as_std140().as_bytes());
    }

    /// Advance the field by `timestep` seconds.
    pub fn step(&mut self, timestep: f32) {
        self.prepare_pass(timestep);
        self.advect();
        self.calculate_divergence();
        self.solve_pressure();
        self.subtract_gradient();
    }

    /// Add a Gaussian impulse of velocity around the splat point.
    pub fn splat(&mut self, splat: &Splat) {
        let point = [splat.x, splat.y];
        let force = splat.force(self.settings.splat_force);

        unsafe {
            self.context.disable(glow::BLEND);
        }

        self.programs.splat.set_uniforms(&[
            &Uniform {
                name: "aspectRatio",
                value: UniformValue::Float(1.0),
            },
            &Uniform {
                name: "point",
                value: UniformValue::Vec2(&point),
            },
            &Uniform {
                name: "force",
                value: UniformValue::Vec3(&force),
            },
            &Uniform {
                name: "radius",
                value: UniformValue::Float(self.settings.splat_radius),
            },
        ]);

        self.quad.draw(
            &self.programs.splat,
            &[self.velocity_textures.read().texture],
            Target::Offscreen(self.velocity_textures.write()),
        );
        self.velocity_textures.swap();
    }

    // Update the timestep and bind the shared uniform block.
    fn prepare_pass(&self, timestep: f32) {
        self.uniform_buffer
            .write_at(0, bytemuck::bytes_of(&timestep));

        unsafe {
            self.context.disable(glow::BLEND);
            self.context.bind_buffer_base(
                glow::UNIFORM_BUFFER,
                FLUID_UNIFORMS_BINDING,
                Some(self.uniform_buffer.id),
            );
        }
    }

    fn advect(&mut self) {
        self.quad.draw(
            &self.programs.advection,
            &[self.velocity_textures.read().texture],
            Target::Offscreen(self.velocity_textures.write()),
        );
        self.velocity_textures.swap();
    }

    fn calculate_divergence(&self) {
        self.quad.draw(
            &self.programs.divergence,
            &[self.velocity_textures.read().texture],
            Target::Offscreen(&self.divergence_texture),
        );
    }

    fn solve_pressure(&mut self) {
        // Every frame starts from zero pressure.
        self.pressure_textures.zero_out();

        for _ in 0..self.settings.pressure_iterations {
            self.quad.draw(
                &self.programs.pressure,
                &[
                    self.pressure_textures.read().texture,
                    self.divergence_texture.texture,
                ],
                Target::Offscreen(self.pressure_textures.write()),
            );
            self.pressure_textures.swap();
        }
    }

    fn subtract_gradient(&mut self) {
        self.quad.draw(
            &self.programs.subtract_gradient,
            &[
                self.pressure_textures.read().texture,
                self.velocity_textures.read().texture,
            ],
            Target::Offscreen(self.velocity_textures.write()),
        );
        self.velocity_textures.swap();
    }

    /// The latest completed velocity field.
    pub fn velocity(&self) -> &Framebuffer {
        self.velocity_textures.read()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    // A CPU mirror of the stencils, with the same clamp-to-edge addressing the
    // GPU textures use.
    struct Grid {
        size: usize,
        cells: Vec<[f32; 2]>,
    }

    impl Grid {
        fn from_fn(size: usize, f: impl Fn(usize, usize) -> [f32; 2]) -> Self {
            let cells = (0..size * size).map(|i| f(i % size, i / size)).collect();
            Self { size, cells }
        }

        fn at(&self, x: isize, y: isize) -> [f32; 2] {
            let clamp = |v: isize| v.clamp(0, self.size as isize - 1) as usize;
            self.cells[clamp(y) * self.size + clamp(x)]
        }

        fn divergence(&self) -> Grid {
            Grid::from_fn(self.size, |x, y| {
                let (x, y) = (x as isize, y as isize);
                let l = self.at(x - 1, y)[0];
                let r = self.at(x + 1, y)[0];
                let t = self.at(x, y + 1)[1];
                let b = self.at(x, y - 1)[1];
                [0.5 * (r - l + t - b), 0.0]
            })
        }

        fn jacobi(&self, divergence: &Grid) -> Grid {
            Grid::from_fn(self.size, |x, y| {
                let (xi, yi) = (x as isize, y as isize);
                let sum = self.at(xi - 1, yi)[0]
                    + self.at(xi + 1, yi)[0]
                    + self.at(xi, yi + 1)[0]
                    + self.at(xi, yi - 1)[0];
                let div = divergence.at(xi, yi)[0];
                [(sum + PRESSURE_ALPHA * div) * PRESSURE_R_BETA, 0.0]
            })
        }

        fn subtract_gradient(&self, pressure: &Grid) -> Grid {
            Grid::from_fn(self.size, |x, y| {
                let (xi, yi) = (x as isize, y as isize);
                let l = pressure.at(xi - 1, yi)[0];
                let r = pressure.at(xi + 1, yi)[0];
                let t = pressure.at(xi, yi + 1)[0];
                let b = pressure.at(xi, yi - 1)[0];
                let v = self.at(xi, yi);
                [v[0] - (r - l), v[1] - (t - b)]
            })
        }
    }

    #[test]
    fn uniform_flow_has_no_divergence() {
        let velocity = Grid::from_fn(6, |_, _| [0.3, -0.2]);
        for cell in velocity.divergence().cells {
            assert_relative_eq!(cell[0], 0.0);
        }
    }

    #[test]
    fn edge_cells_sample_themselves() {
        // vx = x
        let velocity = Grid::from_fn(4, |x, _| [x as f32, 0.0]);
        let divergence = velocity.divergence();

        assert_relative_eq!(divergence.at(0, 1)[0], 0.5);
        assert_relative_eq!(divergence.at(1, 1)[0], 1.0);
        assert_relative_eq!(divergence.at(2, 1)[0], 1.0);
        assert_relative_eq!(divergence.at(3, 1)[0], 0.5);
    }

    #[test]
    fn first_iteration_from_zero_pressure() {
        let divergence = Grid::from_fn(4, |x, y| [(x + y) as f32, 0.0]);
        let pressure = Grid::from_fn(4, |_, _| [0.0, 0.0]).jacobi(&divergence);

        for (p, d) in pressure.cells.iter().zip(divergence.cells.iter()) {
            assert_relative_eq!(p[0], -0.25 * d[0]);
        }
    }

    #[test]
    fn constant_pressure_is_a_fixed_point() {
        let divergence = Grid::from_fn(5, |_, _| [0.0, 0.0]);
        let pressure = Grid::from_fn(5, |_, _| [1.5, 0.0]);

        let next = pressure.jacobi(&divergence);
        for cell in next.cells {
            assert_relative_eq!(cell[0], 1.5);
        }
    }

    #[test]
    fn constant_pressure_leaves_velocity_alone() {
        let velocity = Grid::from_fn(5, |x, y| [x as f32 * 0.1, y as f32 * -0.1]);
        let pressure = Grid::from_fn(5, |_, _| [2.0, 0.0]);

        let projected = velocity.subtract_gradient(&pressure);
        for (a, b) in projected.cells.iter().zip(velocity.cells.iter()) {
            assert_relative_eq!(a[0], b[0]);
            assert_relative_eq!(a[1], b[1]);
        }
    }

    // A source in the middle of an otherwise still field.
    fn source() -> Grid {
        Grid::from_fn(8, |x, y| match (x, y) {
            (3, 4) => [-1.0, 0.0],
            (5, 4) => [1.0, 0.0],
            _ => [0.0, 0.0],
        })
    }

    #[test]
    fn a_converged_pressure_field_is_stable() {
        let divergence = source().divergence();

        let mut pressure = Grid::from_fn(8, |_, _| [0.0, 0.0]);
        for _ in 0..500 {
            pressure = pressure.jacobi(&divergence);
        }

        let next = pressure.jacobi(&divergence);
        for (a, b) in next.cells.iter().zip(pressure.cells.iter()) {
            assert_relative_eq!(a[0], b[0], epsilon = 1e-5);
        }
    }

    #[test]
    fn projection_reduces_divergence() {
        let velocity = source();
        let divergence = velocity.divergence();

        let mut pressure = Grid::from_fn(8, |_, _| [0.0, 0.0]);
        for _ in 0..20 {
            pressure = pressure.jacobi(&divergence);
        }
        let projected = velocity.subtract_gradient(&pressure);

        let total = |grid: &Grid| -> f32 { grid.cells.iter().map(|c| c[0] * c[0]).sum() };
        assert!(total(&projected.divergence()) < total(&divergence));
    }

    #[test]
    fn the_uniform_block_is_std140() {
        let uniforms = FluidUniforms {
            timestep: 0.016,
            dissipation: 0.98,
            texel_size: [1.0 / 128.0, 1.0 / 128.0].into(),
        };
        let bytes = uniforms.as_std140().as_bytes().to_vec();

        // The timestep sits at offset zero, where `prepare_pass` rewrites it.
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &0.016f32.to_ne_bytes());
    }
}
