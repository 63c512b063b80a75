//! Typed uniform handles and the CPU-side staging of uniform blocks.
//!
//! A [`Uniform<T>`] is resolved once at setup from a [`ShaderProgram`]. It
//! remembers the program it came from, the block it lives in and its byte
//! offset, so the frame loop never touches names again. Values are written
//! into a [`UniformStaging`] image of each block; only blocks that changed
//! since the last [`UniformStaging::flush`] are handed to the uploader.
//!
//! [`ShaderProgram`]: crate::pipelines::program::ShaderProgram

use std::marker::PhantomData;

use cgmath::{Matrix3, Matrix4, Vector3, Vector4};

use crate::{
    error::RenderError,
    pipelines::program::{ProgramId, ShaderProgram, ShaderType},
};

/// A Rust value that can be stored into a uniform slot of matching WGSL type.
pub trait UniformValue {
    const TYPE: ShaderType;

    /// Write the value in WGSL uniform layout. `dst` is exactly `TYPE.size()` bytes.
    fn write_to(&self, dst: &mut [u8]);
}

impl UniformValue for f32 {
    const TYPE: ShaderType = ShaderType::F32;

    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::bytes_of(self));
    }
}

impl UniformValue for Vector3<f32> {
    const TYPE: ShaderType = ShaderType::Vec3;

    fn write_to(&self, dst: &mut [u8]) {
        let v: [f32; 3] = (*self).into();
        dst.copy_from_slice(bytemuck::cast_slice(&v));
    }
}

impl UniformValue for Vector4<f32> {
    const TYPE: ShaderType = ShaderType::Vec4;

    fn write_to(&self, dst: &mut [u8]) {
        let v: [f32; 4] = (*self).into();
        dst.copy_from_slice(bytemuck::cast_slice(&v));
    }
}

impl UniformValue for Matrix3<f32> {
    const TYPE: ShaderType = ShaderType::Mat3;

    // mat3x3<f32> columns are vec3 padded to 16 bytes
    fn write_to(&self, dst: &mut [u8]) {
        let cols: [[f32; 3]; 3] = (*self).into();
        for (i, col) in cols.iter().enumerate() {
            let start = i * 16;
            dst[start..start + 12].copy_from_slice(bytemuck::cast_slice(col));
            dst[start + 12..start + 16].fill(0);
        }
    }
}

impl UniformValue for Matrix4<f32> {
    const TYPE: ShaderType = ShaderType::Mat4;

    fn write_to(&self, dst: &mut [u8]) {
        let cols: [[f32; 4]; 4] = (*self).into();
        dst.copy_from_slice(bytemuck::cast_slice(&cols));
    }
}

/// A resolved uniform slot of a specific program.
#[derive(Debug)]
pub struct Uniform<T> {
    pub(crate) name: String,
    pub(crate) program: ProgramId,
    pub(crate) block: usize,
    pub(crate) offset: usize,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Uniform<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            program: self.program,
            block: self.block,
            offset: self.offset,
            _value: PhantomData,
        }
    }
}

impl<T> Uniform<T> {
    pub(crate) fn new(name: &str, program: ProgramId, block: usize, offset: usize) -> Self {
        Self {
            name: name.to_string(),
            program,
            block,
            offset,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone)]
struct StagedBlock {
    bytes: Vec<u8>,
    dirty: bool,
}

/// Byte images of every uniform block of one program.
#[derive(Debug, Clone)]
pub struct UniformStaging {
    program: ProgramId,
    blocks: Vec<StagedBlock>,
}

impl UniformStaging {
    pub fn new(program: &ShaderProgram) -> Self {
        let blocks = program
            .uniform_blocks()
            .iter()
            .map(|block| StagedBlock {
                bytes: vec![0; block.size as usize],
                dirty: false,
            })
            .collect();
        Self {
            program: program.id(),
            blocks,
        }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Store `value` into the slot of `uniform`.
    ///
    /// The handle must have been resolved from the program this staging area
    /// belongs to; writes never silently land in another program's block.
    pub fn set<T: UniformValue>(&mut self, uniform: &Uniform<T>, value: &T) -> Result<(), RenderError> {
        if uniform.program != self.program {
            return Err(RenderError::ForeignHandle {
                name: uniform.name.clone(),
            });
        }
        let block = &mut self.blocks[uniform.block];
        let end = uniform.offset + T::TYPE.size();
        value.write_to(&mut block.bytes[uniform.offset..end]);
        block.dirty = true;
        Ok(())
    }

    pub fn block_bytes(&self, block: usize) -> &[u8] {
        &self.blocks[block].bytes
    }

    pub fn is_dirty(&self, block: usize) -> bool {
        self.blocks[block].dirty
    }

    /// Hand every changed block to `upload` and mark it clean.
    pub fn flush(&mut self, mut upload: impl FnMut(usize, &[u8])) {
        for (index, block) in self.blocks.iter_mut().enumerate() {
            if block.dirty {
                upload(index, &block.bytes);
                block.dirty = false;
            }
        }
    }
}
