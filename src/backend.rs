//! Rendering-backend contract.
//!
//! The mesh and material layers never issue raw graphics calls; everything
//! goes through this narrow trait: compile a shader program, create a data
//! buffer, upload a texture, bind state and draw indexed triangles. A real
//! implementation wraps whatever GL-style API the host window supplies and
//! must live on the thread owning the context.
//!
//! [`NullBackend`] is a headless implementation that hands out ids and
//! records what was asked of it; the demo drivers and the unit tests run
//! against it.

use cgmath::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Triangle winding treated as front-facing for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Cw,
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Tex2d,
    /// A 3d volume packed into a tall 2d image, sampled by shader code.
    Tex3d,
    Cube,
}

/// One attribute in the interleaved vertex layout. Size and offset are in
/// floats.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttr {
    pub name: &'static str,
    pub size: usize,
    pub offset: usize,
}

/// Decoded image data handed to [`RenderBackend::create_texture`]. Pixels
/// are packed RGBA, row major.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([[f32; 3]; 3]),
    Mat4([[f32; 4]; 4]),
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vector2<f32>> for UniformValue {
    fn from(v: Vector2<f32>) -> Self {
        UniformValue::Vec2(v.into())
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(v: Vector3<f32>) -> Self {
        UniformValue::Vec3(v.into())
    }
}

impl From<Vector4<f32>> for UniformValue {
    fn from(v: Vector4<f32>) -> Self {
        UniformValue::Vec4(v.into())
    }
}

impl From<Matrix3<f32>> for UniformValue {
    fn from(v: Matrix3<f32>) -> Self {
        UniformValue::Mat3(v.into())
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(v: Matrix4<f32>) -> Self {
        UniformValue::Mat4(v.into())
    }
}

pub trait RenderBackend {
    /// Compile and link a shader program with the given interleaved vertex
    /// layout (stride in floats). Returns the linker/compiler log on failure.
    fn compile(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        layout: &[VertexAttr],
        stride: usize,
    ) -> Result<ProgramId, String>;

    fn create_buffer(&mut self, kind: BufferKind, bytes: &[u8]) -> BufferId;

    /// Upload one image (2d/volume) or six face images in +x,-x,+y,-y,+z,-z
    /// order (cube). `clamp` selects clamp-to-edge over wrapping.
    fn create_texture(
        &mut self,
        target: TextureTarget,
        clamp: bool,
        images: &[TextureImage<'_>],
    ) -> TextureId;

    fn use_program(&mut self, prog: ProgramId);

    fn set_uniform(&mut self, prog: ProgramId, name: &str, value: UniformValue);

    fn bind_texture(&mut self, slot: usize, target: TextureTarget, tex: TextureId);

    fn draw_indexed(
        &mut self,
        vertices: BufferId,
        elements: BufferId,
        count: usize,
        winding: Winding,
    );
}

/// One recorded draw from [`NullBackend`].
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    pub program: Option<ProgramId>,
    pub count: usize,
    pub winding: Winding,
}

/// Headless backend: allocates ids and keeps counters so drivers and tests
/// can observe what the pipeline asked for without a graphics context.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_id: u32,
    current: Option<ProgramId>,
    pub programs_compiled: usize,
    pub buffers_created: usize,
    pub textures_created: usize,
    pub program_switches: usize,
    pub uniforms_set: usize,
    pub draws: Vec<DrawCall>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for NullBackend {
    fn compile(
        &mut self,
        _vertex_src: &str,
        _fragment_src: &str,
        _layout: &[VertexAttr],
        _stride: usize,
    ) -> Result<ProgramId, String> {
        self.programs_compiled += 1;
        Ok(ProgramId(self.next()))
    }

    fn create_buffer(&mut self, _kind: BufferKind, _bytes: &[u8]) -> BufferId {
        self.buffers_created += 1;
        BufferId(self.next())
    }

    fn create_texture(
        &mut self,
        _target: TextureTarget,
        _clamp: bool,
        _images: &[TextureImage<'_>],
    ) -> TextureId {
        self.textures_created += 1;
        TextureId(self.next())
    }

    fn use_program(&mut self, prog: ProgramId) {
        if self.current != Some(prog) {
            self.program_switches += 1;
            self.current = Some(prog);
        }
    }

    fn set_uniform(&mut self, _prog: ProgramId, _name: &str, _value: UniformValue) {
        self.uniforms_set += 1;
    }

    fn bind_texture(&mut self, _slot: usize, _target: TextureTarget, _tex: TextureId) {}

    fn draw_indexed(
        &mut self,
        _vertices: BufferId,
        _elements: BufferId,
        count: usize,
        winding: Winding,
    ) {
        self.draws.push(DrawCall {
            program: self.current,
            count,
            winding,
        });
    }
}
