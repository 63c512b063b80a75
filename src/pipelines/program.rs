//! Shader compilation, linking and reflection.
//!
//! Each WGSL stage is parsed and validated on its own with naga. Linking then
//! checks that the stages fit together and builds the lookup tables for
//! attributes and uniforms:
//!
//! 1. every fragment input location is written by the vertex stage with the same type
//! 2. a uniform block declared by both stages has the same layout in both
//! 3. bind groups are numbered contiguously from 0
//! 4. vertex inputs are float scalars or vectors
//!
//! Lookups by name are meant for setup only. They return typed handles
//! ([`Attribute`], [`Uniform`]) that the frame loop uses from then on.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::atomic::{AtomicU32, Ordering},
};

use naga::{AddressSpace, Binding, Handle, Module, Scalar, Type, TypeInner, VectorSize};

use crate::{
    error::{RenderError, ShaderStage},
    pipelines::uniforms::{Uniform, UniformValue},
};

pub use naga::valid::Capabilities;

static NEXT_PROGRAM_ID: AtomicU32 = AtomicU32::new(1);

/// Shader capabilities every target offers, down to WebGL2.
pub const BASELINE_CAPABILITIES: Capabilities = Capabilities::empty();

/// Identifies one linked program for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

/// The WGSL value types attributes, varyings and uniforms can have here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderType {
    F32,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl ShaderType {
    pub fn name(self) -> &'static str {
        match self {
            ShaderType::F32 => "f32",
            ShaderType::Vec2 => "vec2<f32>",
            ShaderType::Vec3 => "vec3<f32>",
            ShaderType::Vec4 => "vec4<f32>",
            ShaderType::Mat3 => "mat3x3<f32>",
            ShaderType::Mat4 => "mat4x4<f32>",
        }
    }

    /// Size in bytes within a uniform buffer.
    pub fn size(self) -> usize {
        match self {
            ShaderType::F32 => 4,
            ShaderType::Vec2 => 8,
            ShaderType::Vec3 => 12,
            ShaderType::Vec4 => 16,
            ShaderType::Mat3 => 48,
            ShaderType::Mat4 => 64,
        }
    }

    pub fn vertex_format(self) -> Option<wgpu::VertexFormat> {
        match self {
            ShaderType::F32 => Some(wgpu::VertexFormat::Float32),
            ShaderType::Vec2 => Some(wgpu::VertexFormat::Float32x2),
            ShaderType::Vec3 => Some(wgpu::VertexFormat::Float32x3),
            ShaderType::Vec4 => Some(wgpu::VertexFormat::Float32x4),
            ShaderType::Mat3 | ShaderType::Mat4 => None,
        }
    }

    fn classify(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(ShaderType::F32),
            TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => match size {
                VectorSize::Bi => Some(ShaderType::Vec2),
                VectorSize::Tri => Some(ShaderType::Vec3),
                VectorSize::Quad => Some(ShaderType::Vec4),
            },
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } if scalar == Scalar::F32 => match (columns, rows) {
                (VectorSize::Tri, VectorSize::Tri) => Some(ShaderType::Mat3),
                (VectorSize::Quad, VectorSize::Quad) => Some(ShaderType::Mat4),
                _ => None,
            },
            _ => None,
        }
    }
}

fn type_name(ty: Option<ShaderType>) -> &'static str {
    ty.map_or("an unsupported type", ShaderType::name)
}

/// A vertex input slot of the linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// One `var<uniform>` binding of the linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u64,
    pub visibility: wgpu::ShaderStages,
    members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
struct Member {
    name: String,
    offset: usize,
    ty: Option<ShaderType>,
}

#[derive(Debug, Clone)]
struct Location {
    name: String,
    location: u32,
    ty: Option<ShaderType>,
}

#[derive(Debug, Clone, Copy)]
struct UniformSlot {
    block: usize,
    offset: usize,
    ty: ShaderType,
}

/// A single validated shader stage.
#[derive(Debug)]
pub struct CompiledStage {
    stage: ShaderStage,
    source: String,
    entry_point: String,
    inputs: Vec<Location>,
    outputs: Vec<Location>,
    blocks: Vec<UniformBlock>,
}

impl CompiledStage {
    /// Parse and validate `source`, which must contain an entry point for `stage`.
    pub fn compile(stage: ShaderStage, source: &str) -> Result<Self, RenderError> {
        Self::compile_with(stage, source, BASELINE_CAPABILITIES)
    }

    /// Like [`CompiledStage::compile`], but allows the given device capabilities.
    pub fn compile_with(
        stage: ShaderStage,
        source: &str,
        capabilities: Capabilities,
    ) -> Result<Self, RenderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::Compile {
            stage,
            diagnostic: e.emit_to_string(source),
        })?;
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            capabilities,
        );
        validator
            .validate(&module)
            .map_err(|e| RenderError::Compile {
                stage,
                diagnostic: format!("validation error: {e}"),
            })?;

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == stage.to_naga())
            .ok_or_else(|| RenderError::Compile {
                stage,
                diagnostic: format!("no @{stage} entry point found"),
            })?;

        let mut inputs = Vec::new();
        for arg in &entry.function.arguments {
            collect_locations(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs);
        }
        let mut outputs = Vec::new();
        if let Some(result) = &entry.function.result {
            collect_locations(&module, None, result.ty, result.binding.as_ref(), &mut outputs);
        }
        let blocks = collect_blocks(&module, stage)?;

        log::debug!(
            "compiled {} stage `{}`: {} inputs, {} outputs, {} uniform blocks",
            stage,
            entry.name,
            inputs.len(),
            outputs.len(),
            blocks.len()
        );

        Ok(Self {
            stage,
            source: source.to_string(),
            entry_point: entry.name.clone(),
            inputs,
            outputs,
            blocks,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

fn collect_locations(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Location>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Location {
            name: name.unwrap_or_default().to_string(),
            location: *location,
            ty: ShaderType::classify(inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_locations(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn collect_blocks(module: &Module, stage: ShaderStage) -> Result<Vec<UniformBlock>, RenderError> {
    let mut blocks = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(resource) = &var.binding else {
            continue;
        };
        let name = var.name.clone().unwrap_or_default();
        if var.space != AddressSpace::Uniform {
            return Err(RenderError::Compile {
                stage,
                diagnostic: format!("`{name}` is not a uniform buffer; only uniform buffers are supported"),
            });
        }
        let (members, size) = match &module.types[var.ty].inner {
            TypeInner::Struct { members, span } => (
                members
                    .iter()
                    .map(|member| Member {
                        name: member.name.clone().unwrap_or_default(),
                        offset: member.offset as usize,
                        ty: ShaderType::classify(&module.types[member.ty].inner),
                    })
                    .collect(),
                *span as u64,
            ),
            inner => {
                let ty = ShaderType::classify(inner).ok_or_else(|| RenderError::Compile {
                    stage,
                    diagnostic: format!("uniform `{name}` has an unsupported type"),
                })?;
                let member = Member {
                    name: name.clone(),
                    offset: 0,
                    ty: Some(ty),
                };
                (vec![member], (ty.size() as u64).next_multiple_of(16))
            }
        };
        blocks.push(UniformBlock {
            name,
            group: resource.group,
            binding: resource.binding,
            size,
            visibility: stage.to_wgpu(),
            members,
        });
    }
    Ok(blocks)
}

/// A linked vertex + fragment pair with resolved interface tables.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    vertex: CompiledStage,
    fragment: CompiledStage,
    attributes: HashMap<String, Attribute>,
    uniforms: HashMap<String, UniformSlot>,
    blocks: Vec<UniformBlock>,
}

impl ShaderProgram {
    /// Compile both stages independently, then link them.
    ///
    /// Only [`BASELINE_CAPABILITIES`] are allowed, so a program that compiles
    /// here runs on any device.
    pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<Self, RenderError> {
        Self::compile_with(vertex_source, fragment_source, BASELINE_CAPABILITIES)
    }

    pub fn compile_with(
        vertex_source: &str,
        fragment_source: &str,
        capabilities: Capabilities,
    ) -> Result<Self, RenderError> {
        let vertex = CompiledStage::compile_with(ShaderStage::Vertex, vertex_source, capabilities)?;
        let fragment = CompiledStage::compile_with(ShaderStage::Fragment, fragment_source, capabilities)?;
        Self::link(vertex, fragment)
    }

    pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<Self, RenderError> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(link_error(format!(
                "expected a vertex and a fragment stage, got {} and {}",
                vertex.stage, fragment.stage
            )));
        }

        for input in &fragment.inputs {
            let output = vertex
                .outputs
                .iter()
                .find(|o| o.location == input.location)
                .ok_or_else(|| {
                    link_error(format!(
                        "fragment input `{}` at location {} is not written by the vertex stage",
                        input.name, input.location
                    ))
                })?;
            if output.ty.is_none() || output.ty != input.ty {
                return Err(link_error(format!(
                    "varying at location {} is {} in the vertex stage but {} in the fragment stage",
                    input.location,
                    type_name(output.ty),
                    type_name(input.ty)
                )));
            }
        }

        let mut merged: BTreeMap<(u32, u32), UniformBlock> = BTreeMap::new();
        for block in vertex.blocks.iter().chain(&fragment.blocks) {
            match merged.get_mut(&(block.group, block.binding)) {
                Some(existing) => {
                    if existing.size != block.size || existing.members != block.members {
                        return Err(link_error(format!(
                            "uniform block @group({}) @binding({}) is declared differently in the two stages",
                            block.group, block.binding
                        )));
                    }
                    existing.visibility |= block.visibility;
                }
                None => {
                    merged.insert((block.group, block.binding), block.clone());
                }
            }
        }
        let groups: BTreeSet<u32> = merged.keys().map(|(group, _)| *group).collect();
        if let Some((expected, _)) = groups.iter().enumerate().find(|(i, g)| *i as u32 != **g) {
            return Err(link_error(format!(
                "bind groups must be numbered contiguously from 0; group {expected} is missing"
            )));
        }
        let blocks: Vec<UniformBlock> = merged.into_values().collect();

        let mut uniforms = HashMap::new();
        for (index, block) in blocks.iter().enumerate() {
            for member in &block.members {
                let Some(ty) = member.ty else { continue };
                let slot = UniformSlot {
                    block: index,
                    offset: member.offset,
                    ty,
                };
                if uniforms.insert(member.name.clone(), slot).is_some() {
                    return Err(link_error(format!(
                        "uniform `{}` is declared in more than one block",
                        member.name
                    )));
                }
            }
        }

        let mut attributes = HashMap::new();
        for input in &vertex.inputs {
            let format = input.ty.and_then(ShaderType::vertex_format).ok_or_else(|| {
                link_error(format!(
                    "attribute `{}` has {}; only float scalars and vectors are supported",
                    input.name,
                    type_name(input.ty)
                ))
            })?;
            attributes.insert(
                input.name.clone(),
                Attribute {
                    location: input.location,
                    format,
                },
            );
        }

        let id = ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed));
        log::info!(
            "linked shader program {:?}: {} attributes, {} uniforms in {} blocks",
            id,
            attributes.len(),
            uniforms.len(),
            blocks.len()
        );

        Ok(Self {
            id,
            vertex,
            fragment,
            attributes,
            uniforms,
            blocks,
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    /// Uniform blocks ordered by group, then binding.
    pub fn uniform_blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    /// Resolve a vertex input by name.
    pub fn get_attribute(&self, name: &str) -> Result<Attribute, RenderError> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::NotFound {
                kind: "attribute",
                name: name.to_string(),
            })
    }

    /// Resolve a uniform by name, checking its declared type against `T`.
    pub fn get_uniform<T: UniformValue>(&self, name: &str) -> Result<Uniform<T>, RenderError> {
        let slot = self.uniforms.get(name).ok_or_else(|| RenderError::NotFound {
            kind: "uniform",
            name: name.to_string(),
        })?;
        if slot.ty != T::TYPE {
            return Err(RenderError::UniformType {
                name: name.to_string(),
                expected: T::TYPE.name(),
                found: slot.ty.name(),
            });
        }
        Ok(Uniform::new(name, self.id, slot.block, slot.offset))
    }
}

fn link_error(diagnostic: String) -> RenderError {
    RenderError::Link { diagnostic }
}
