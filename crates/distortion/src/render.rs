use glow::HasContext;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use thiserror::Error;

pub type Context = Rc<glow::Context>;
pub type GlDataType = u32;
type Result<T> = std::result::Result<T, Problem>;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Ran out of memory")]
    OutOfMemory,

    #[error("Cannot create buffer")]
    CannotCreateBuffer,

    #[error("Cannot create texture")]
    CannotCreateTexture,

    #[error("Cannot create framebuffer")]
    CannotCreateFramebuffer,

    #[error("{}", match .0 {
        Some(n) => format!("Cannot create shader: {}", n),
        None => "Cannot create shader".to_string(),
    })]
    CannotCreateShader(Option<String>),

    #[error("Cannot create program")]
    CannotCreateProgram,

    #[error("Cannot link program: {0}")]
    CannotLinkProgram(String),

    #[error("Unexpected data size. Expected: {expected:?}. Actual: {actual:?} ")]
    WrongDataSize { expected: usize, actual: usize },

    #[error("Unsupported texture format: {0:#x}")]
    UnsupportedTextureFormat(GlDataType),
}

pub struct Buffer {
    context: Context,
    pub id: glow::Buffer,
    pub type_: u32,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_buffer(self.id);
        }
    }
}

impl Buffer {
    pub fn from_bytes(
        context: &Context,
        data: &[u8],
        buffer_type: u32,
        usage: u32,
    ) -> Result<Self> {
        let buffer = unsafe {
            let buffer = context
                .create_buffer()
                .map_err(|_| Problem::CannotCreateBuffer)?;

            context.bind_buffer(buffer_type, Some(buffer));
            context.buffer_data_u8_slice(buffer_type, data, usage);
            context.bind_buffer(buffer_type, None);

            buffer
        };

        Ok(Self {
            context: Rc::clone(context),
            id: buffer,
            type_: buffer_type,
        })
    }

    pub fn from_f32(context: &Context, data: &[f32], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }

    pub fn from_u16(context: &Context, data: &[u16], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }

    pub fn write_at(&self, offset: i32, data: &[u8]) {
        unsafe {
            self.context.bind_buffer(self.type_, Some(self.id));
            self.context.buffer_sub_data_u8_slice(self.type_, offset, data);
            self.context.bind_buffer(self.type_, None);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TextureOptions {
    pub mag_filter: GlDataType,
    pub min_filter: GlDataType,
    pub wrap_s: GlDataType,
    pub wrap_t: GlDataType,
    pub format: GlDataType,
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions {
            mag_filter: glow::LINEAR,
            min_filter: glow::LINEAR,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
            format: glow::RGBA8,
        }
    }
}

impl TextureOptions {
    pub fn apply(&self, context: &Context) {
        unsafe {
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                self.mag_filter as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                self.min_filter as i32,
            );
            context.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, self.wrap_s as i32);
            context.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, self.wrap_t as i32);
        }
    }
}

pub struct Framebuffer {
    context: Context,
    pub id: glow::Framebuffer,
    pub width: u32,
    pub height: u32,
    pub texture: glow::Texture,
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));
            self.context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                None,
                0,
            );
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context.delete_framebuffer(self.id);
            self.context.delete_texture(self.texture);
        }
    }
}

impl Framebuffer {
    // Allocates the texture storage and attaches it. The contents are
    // undefined until written or cleared.
    pub fn new(
        context: &Context,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<Self> {
        let TextureFormat {
            internal_format,
            format,
            type_,
        } = detect_texture_format(options.format)?;

        let (framebuffer, texture) = unsafe {
            let texture = context
                .create_texture()
                .map_err(|_| Problem::CannotCreateTexture)?;

            context.bind_texture(glow::TEXTURE_2D, Some(texture));
            options.apply(context);
            context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                width as i32,
                height as i32,
                0,
                format,
                type_,
                None,
            );
            context.bind_texture(glow::TEXTURE_2D, None);

            let framebuffer = match context.create_framebuffer() {
                Ok(framebuffer) => framebuffer,
                Err(_) => {
                    context.delete_texture(texture);
                    return Err(Problem::CannotCreateFramebuffer);
                }
            };

            context.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            context.bind_framebuffer(glow::FRAMEBUFFER, None);

            (framebuffer, texture)
        };

        Ok(Self {
            context: Rc::clone(context),
            id: framebuffer,
            width,
            height,
            texture,
        })
    }

    pub fn zero_out(&self) {
        self.clear_color_with(&[0.0, 0.0, 0.0, 0.0])
    }

    pub fn clear_color_with(&self, color: &[f32; 4]) {
        unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));

            self.context
                .viewport(0, 0, self.width as i32, self.height as i32);
            self.context
                .clear_color(color[0], color[1], color[2], color[3]);
            self.context.clear(glow::COLOR_BUFFER_BIT);

            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }
}

/// Two interchangeable slots with a parity index. `read` holds the last
/// completed state and `write` receives the next one; `swap` flips the roles.
pub struct PingPong<T> {
    slots: [T; 2],
    read_index: usize,
}

impl<T> PingPong<T> {
    pub fn new(front: T, back: T) -> Self {
        Self {
            slots: [front, back],
            read_index: 0,
        }
    }

    pub fn read(&self) -> &T {
        &self.slots[self.read_index]
    }

    pub fn write(&self) -> &T {
        &self.slots[1 - self.read_index]
    }

    pub fn swap(&mut self) {
        self.read_index = 1 - self.read_index;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

pub type DoubleFramebuffer = PingPong<Framebuffer>;

impl DoubleFramebuffer {
    pub fn zero_out(&self) {
        self.iter().for_each(Framebuffer::zero_out);
    }
}

pub struct Program {
    context: Context,
    pub program: glow::Program,
    attributes: FxHashMap<String, AttributeInfo>,
    uniforms: FxHashMap<String, UniformInfo>,
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_program(self.program);
        }
    }
}

impl Program {
    pub fn new(context: &Context, shaders: (&str, &str)) -> Result<Self> {
        let vertex_shader = compile_shader(context, glow::VERTEX_SHADER, shaders.0)?;
        let fragment_shader = match compile_shader(context, glow::FRAGMENT_SHADER, shaders.1) {
            Ok(shader) => shader,
            Err(problem) => {
                unsafe { context.delete_shader(vertex_shader) };
                return Err(problem);
            }
        };

        let program = unsafe {
            let program = context
                .create_program()
                .map_err(|_| Problem::CannotCreateProgram)?;
            context.attach_shader(program, vertex_shader);
            context.attach_shader(program, fragment_shader);
            context.link_program(program);

            // Delete the shaders to free up memory
            context.detach_shader(program, vertex_shader);
            context.detach_shader(program, fragment_shader);
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);

            if !context.get_program_link_status(program) {
                let info_log = context.get_program_info_log(program);
                context.delete_program(program);
                return Err(Problem::CannotLinkProgram(info_log));
            }

            program
        };

        let mut attributes = FxHashMap::default();
        unsafe {
            let attribute_count = context.get_active_attributes(program);
            for num in 0..attribute_count {
                if let Some(info) = context.get_active_attribute(program, num) {
                    if let Some(location) = context.get_attrib_location(program, &info.name) {
                        attributes.insert(info.name, AttributeInfo { location });
                    }
                }
            }
        }

        let mut uniforms = FxHashMap::default();
        unsafe {
            let uniform_count = context.get_active_uniforms(program);
            for num in 0..uniform_count {
                if let Some(info) = context.get_active_uniform(program, num) {
                    if let Some(location) = context.get_uniform_location(program, &info.name) {
                        uniforms.insert(info.name, UniformInfo { location });
                    }
                }
            }
        }

        Ok(Program {
            context: Rc::clone(context),
            program,
            attributes,
            uniforms,
        })
    }

    pub fn use_program(&self) {
        unsafe {
            self.context.use_program(Some(self.program));
        }
    }

    pub fn set_uniforms(&self, uniforms: &[&Uniform]) {
        for uniform in uniforms.iter() {
            self.set_uniform(uniform);
        }
    }

    pub fn set_uniform(&self, uniform: &Uniform) {
        let context = &self.context;
        self.use_program();

        // Uniforms that the driver optimised away have no location. Setting
        // them is a no-op.
        let location = self.get_uniform_location(uniform.name);
        let location = location.as_ref();

        unsafe {
            match uniform.value {
                UniformValue::Float(value) => context.uniform_1_f32(location, value),

                UniformValue::Vec2(value) => context.uniform_2_f32(location, value[0], value[1]),

                UniformValue::Vec3(value) => {
                    context.uniform_3_f32(location, value[0], value[1], value[2])
                }

                UniformValue::Texture2D(unit) => context.uniform_1_i32(location, unit as i32),
            }
        }
    }

    pub fn set_uniform_block(&self, name: &str, index: u32) {
        if let Some(location) = self.get_uniform_block_location(name) {
            unsafe {
                self.context
                    .uniform_block_binding(self.program, location, index);
            }
        }
    }

    pub fn get_attrib_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).map(|info| info.location)
    }

    pub fn get_uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.uniforms.get(name).map(|info| info.location.clone())
    }

    pub fn get_uniform_block_location(&self, name: &str) -> Option<u32> {
        unsafe { self.context.get_uniform_block_index(self.program, name) }
    }
}

#[derive(Clone)]
struct AttributeInfo {
    location: u32,
}

#[derive(Clone)]
struct UniformInfo {
    location: glow::UniformLocation,
}

pub struct Uniform<'a> {
    pub name: &'static str,
    pub value: UniformValue<'a>,
}

#[derive(Clone)]
pub enum UniformValue<'a> {
    Float(f32),
    Vec2(&'a [f32; 2]),
    Vec3(&'a [f32; 3]),
    Texture2D(u32),
}

pub fn compile_shader(context: &Context, shader_type: u32, source: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = context
            .create_shader(shader_type)
            .map_err(|_| Problem::CannotCreateShader(None))?;
        context.shader_source(shader, source);
        context.compile_shader(shader);

        if context.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let info_log = context.get_shader_info_log(shader);
            context.delete_shader(shader);
            Err(Problem::CannotCreateShader(Some(info_log)))
        }
    }
}

/// A float attribute, read per vertex.
#[derive(Default)]
pub struct VertexBufferLayout {
    pub name: &'static str,
    pub size: u32,
    pub stride: u32,
    pub offset: u32,
}

struct TextureFormat {
    internal_format: GlDataType,
    format: GlDataType,
    type_: GlDataType,
}

// https://www.khronos.org/registry/webgl/specs/latest/2.0/#TEXTURE_TYPES_FORMATS_FROM_DOM_ELEMENTS_TABLE
fn detect_texture_format(internal_format: GlDataType) -> Result<TextureFormat> {
    match internal_format {
        glow::R16F => Ok(TextureFormat {
            internal_format,
            format: glow::RED,
            type_: glow::HALF_FLOAT,
        }),
        glow::RG16F => Ok(TextureFormat {
            internal_format,
            format: glow::RG,
            type_: glow::HALF_FLOAT,
        }),
        glow::RGBA8 => Ok(TextureFormat {
            internal_format,
            format: glow::RGBA,
            type_: glow::UNSIGNED_BYTE,
        }),
        _ => Err(Problem::UnsupportedTextureFormat(internal_format)),
    }
}

pub struct VertexArrayObject {
    context: Context,
    pub id: glow::VertexArray,
}

impl Drop for VertexArrayObject {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_vertex_array(self.id);
        }
    }
}

impl VertexArrayObject {
    pub fn empty(context: &Context) -> Result<Self> {
        let id = unsafe {
            context
                .create_vertex_array()
                .map_err(|_| Problem::OutOfMemory)?
        };

        Ok(Self {
            id,
            context: Rc::clone(context),
        })
    }

    pub fn new(
        context: &Context,
        program: &Program,
        vertices: &[(&Buffer, VertexBufferLayout)],
        indices: Option<&Buffer>,
    ) -> Result<Self> {
        let vao = Self::empty(context)?;

        unsafe {
            context.bind_vertex_array(Some(vao.id));

            for (vertex, attribute) in vertices.iter() {
                bind_attributes(context, program, vertex, attribute)?;
            }

            if let Some(buffer) = indices {
                context.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer.id));
            }

            context.bind_vertex_array(None);
        }

        Ok(vao)
    }
}

pub fn bind_attributes(
    context: &Context,
    program: &Program,
    buffer: &Buffer,
    buffer_layout: &VertexBufferLayout,
) -> Result<()> {
    unsafe {
        context.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.id));

        if let Some(location) = program.get_attrib_location(buffer_layout.name) {
            context.enable_vertex_attrib_array(location);

            context.vertex_attrib_pointer_f32(
                location,
                buffer_layout.size as i32,
                glow::FLOAT,
                false,
                buffer_layout.stride as i32,
                buffer_layout.offset as i32,
            );
        }

        context.bind_buffer(glow::ARRAY_BUFFER, None);
    }

    Ok(())
}

/// Where a full-screen quad draw lands.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Offscreen(&'a Framebuffer),
    Canvas { width: u32, height: u32 },
}

/// A clip-space quad shared by every pass.
///
/// Each draw binds its own framebuffer, viewport and input textures, and
/// unbinds them afterwards, so no pass inherits bindings from the previous
/// one.
pub struct Quad {
    context: Context,
    vertex_array: VertexArrayObject,
    #[allow(unused)]
    vertices: Buffer,
    #[allow(unused)]
    indices: Buffer,
}

impl Quad {
    pub fn new(context: &Context, program: &Program) -> Result<Self> {
        let vertices = Buffer::from_f32(
            context,
            &crate::data::PLANE_VERTICES,
            glow::ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;
        let indices = Buffer::from_u16(
            context,
            &crate::data::PLANE_INDICES,
            glow::ELEMENT_ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;

        let vertex_array = VertexArrayObject::new(
            context,
            program,
            &[(
                &vertices,
                VertexBufferLayout {
                    name: "position",
                            ..Default::default()
                },
            )],
            Some(&indices),
        )?;

        Ok(Self {
            context: Rc::clone(context),
            vertex_array,
            vertices,
            indices,
        })
    }

    /// Draw with `program`, binding `textures` to texture units 0, 1, … in
    /// order.
    pub fn draw(&self, program: &Program, textures: &[glow::Texture], target: Target) {
        let (framebuffer, width, height) = match target {
            Target::Offscreen(framebuffer) => {
                (Some(framebuffer.id), framebuffer.width, framebuffer.height)
            }
            Target::Canvas { width, height } => (None, width, height),
        };

        unsafe {
            self.context
                .bind_framebuffer(glow::DRAW_FRAMEBUFFER, framebuffer);
            self.context.viewport(0, 0, width as i32, height as i32);

            program.use_program();

            for (unit, texture) in textures.iter().enumerate() {
                self.context.active_texture(glow::TEXTURE0 + unit as u32);
                self.context.bind_texture(glow::TEXTURE_2D, Some(*texture));
            }

            self.context
                .bind_vertex_array(Some(self.vertex_array.id));
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            self.context.bind_vertex_array(None);

            for unit in 0..textures.len() {
                self.context.active_texture(glow::TEXTURE0 + unit as u32);
                self.context.bind_texture(glow::TEXTURE_2D, None);
            }
            self.context.active_texture(glow::TEXTURE0);

            self.context.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_and_write_are_always_distinct() {
        let mut pair = PingPong::new("front", "back");

        for _ in 0..7 {
            assert_ne!(pair.read(), pair.write());
            pair.swap();
        }
        assert_ne!(pair.read(), pair.write());
    }

    #[test]
    fn two_swaps_restore_the_roles() {
        let mut pair = PingPong::new(1, 2);
        assert_eq!((*pair.read(), *pair.write()), (1, 2));

        pair.swap();
        assert_eq!((*pair.read(), *pair.write()), (2, 1));

        pair.swap();
        assert_eq!((*pair.read(), *pair.write()), (1, 2));
    }

    #[test]
    fn swap_does_not_move_the_slots() {
        let mut pair = PingPong::new(String::from("a"), String::from("b"));
        let read = pair.read().as_ptr();
        let write = pair.write().as_ptr();

        pair.swap();

        assert_eq!(pair.read().as_ptr(), write);
        assert_eq!(pair.write().as_ptr(), read);
    }

    #[test]
    fn storage_matches_the_internal_format() {
        let storage = |format| {
            detect_texture_format(format)
                .map(|format| (format.format, format.type_))
                .ok()
        };
        assert_eq!(storage(glow::R16F), Some((glow::RED, glow::HALF_FLOAT)));
        assert_eq!(storage(glow::RG16F), Some((glow::RG, glow::HALF_FLOAT)));
        assert_eq!(storage(glow::RGBA8), Some((glow::RGBA, glow::UNSIGNED_BYTE)));
        assert!(detect_texture_format(glow::RGBA32F).is_err());
    }
}
