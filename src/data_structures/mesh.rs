//! Mesh data as supplied by a mesh source.
//!
//! A [`Mesh`] is the external, flat representation: three parallel float
//! arrays with 3 components per vertex and one `u16` index array. Uploading
//! requires a [`ValidMesh`], which can only be obtained through
//! [`Mesh::validate`], so malformed data never reaches the GPU.

use crate::error::MeshError;

/// Number of float components of every vertex attribute.
pub const COMPONENTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u16>,
}

/// A mesh whose parallel arrays agree in length and whose indices are in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMesh(Mesh);

impl Mesh {
    pub fn new(positions: Vec<f32>, colors: Vec<f32>, normals: Vec<f32>, indices: Vec<u16>) -> Self {
        Self {
            positions,
            colors,
            normals,
            indices,
        }
    }

    /// Check the mesh invariants and hand out an uploadable mesh.
    ///
    /// Fails if any attribute array is not made of whole 3-float vertices, if
    /// the arrays describe different vertex counts, or if an index points past
    /// the last vertex.
    pub fn validate(self) -> Result<ValidMesh, MeshError> {
        let positions = vertex_count("positions", &self.positions)?;
        let colors = vertex_count("colors", &self.colors)?;
        let normals = vertex_count("normals", &self.normals)?;
        if positions != colors || positions != normals {
            return Err(MeshError::LengthMismatch {
                positions,
                colors,
                normals,
            });
        }
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, i)| **i as usize >= positions)
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                position,
                vertices: positions,
            });
        }
        if self.indices.len() % 3 != 0 {
            log::warn!(
                "mesh has {} indices; the trailing {} do not form a triangle and will not be drawn",
                self.indices.len(),
                self.indices.len() % 3
            );
        }
        Ok(ValidMesh(self))
    }

    /// An axis-aligned cube with unit edge length centred at the origin.
    ///
    /// The 8 corners are shared between faces, so every corner carries the
    /// normalized diagonal as its normal and its own colour.
    pub fn cube() -> Self {
        let mut positions = Vec::with_capacity(8 * COMPONENTS);
        let mut colors = Vec::with_capacity(8 * COMPONENTS);
        let mut normals = Vec::with_capacity(8 * COMPONENTS);
        // Corner order: bottom face counter-clockwise from (-,-,-), then the top face.
        let corners: [[f32; 3]; 8] = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        let inv_len = 1.0 / 3.0_f32.sqrt();
        for corner in corners {
            positions.extend(corner.iter().map(|c| c * 0.5));
            colors.extend(corner.iter().map(|&c| if c > 0.0 { 1.0 } else { 0.25 }));
            normals.extend(corner.iter().map(|c| c * inv_len));
        }
        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6, 4, 6, 7, // front  (+z)
            1, 0, 3, 1, 3, 2, // back   (-z)
            5, 1, 2, 5, 2, 6, // right  (+x)
            0, 4, 7, 0, 7, 3, // left   (-x)
            7, 6, 2, 7, 2, 3, // top    (+y)
            0, 1, 5, 0, 5, 4, // bottom (-y)
        ];
        Self::new(positions, colors, normals, indices)
    }
}

impl ValidMesh {
    pub fn vertex_count(&self) -> usize {
        self.0.positions.len() / COMPONENTS
    }

    pub fn index_count(&self) -> u32 {
        self.0.indices.len() as u32
    }

    pub fn mesh(&self) -> &Mesh {
        &self.0
    }

    pub fn into_inner(self) -> Mesh {
        self.0
    }
}

fn vertex_count(attribute: &'static str, data: &[f32]) -> Result<usize, MeshError> {
    if data.len() % COMPONENTS != 0 {
        return Err(MeshError::NotTriplets {
            attribute,
            len: data.len(),
        });
    }
    Ok(data.len() / COMPONENTS)
}
