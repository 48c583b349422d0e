//! In-memory polygon mesh implementing [`MeshHost`].
//!
//! `PolyMesh` is an indexed polygon list with named attributes and UV layers.
//! It can be built from a Bevy `Mesh`, where edge-connected coplanar triangles
//! become one polygon face, and writes its active UV layer back into one.

use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::math::AXIS_EPSILON;

use super::{
    AttributeDomain, AttributeInfo, AttributeKind, CornerIndex, FaceIndex, MeshHost, VertexIndex,
};

impl AttributeKind {
    /// Number of floats per element.
    pub fn components(self) -> usize {
        match self {
            AttributeKind::Float | AttributeKind::Int | AttributeKind::Bool => 1,
            AttributeKind::Float2 => 2,
            AttributeKind::Float3 => 3,
            AttributeKind::Color => 4,
        }
    }
}

/// A polygon with a contiguous run of corners.
#[derive(Debug, Clone)]
pub struct PolyFace {
    pub corner_start: usize,
    pub corner_count: usize,
    pub normal: Vec3,
    pub selected: bool,
}

impl PolyFace {
    pub fn corners(&self) -> Range<CornerIndex> {
        self.corner_start..self.corner_start + self.corner_count
    }
}

/// A named attribute stored as flat floats.
#[derive(Debug, Clone)]
pub struct MeshAttribute {
    pub name: String,
    pub info: AttributeInfo,
    pub values: Vec<f32>,
}

/// A named per-corner UV layer.
#[derive(Debug, Clone)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

/// Indexed polygon mesh suitable for face-level texturing.
#[derive(Debug, Clone)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub vertex_selected: Vec<bool>,
    pub faces: Vec<PolyFace>,
    /// Vertex index of every corner.
    pub corner_verts: Vec<u32>,
    pub attributes: Vec<MeshAttribute>,
    pub uv_layers: Vec<UvLayer>,
    pub active_uv: Option<usize>,
    pub active_face: Option<FaceIndex>,
    /// Object-to-world transform.
    pub world: Mat4,
    pub edit_mode: bool,
    /// Number of times a writer flushed into this mesh.
    pub update_count: usize,
}

impl PolyMesh {
    /// Build a mesh from vertex positions and polygons given as vertex loops.
    pub fn from_polygons(positions: Vec<Vec3>, polygons: &[Vec<u32>]) -> Self {
        let mut faces = Vec::with_capacity(polygons.len());
        let mut corner_verts = Vec::new();
        for polygon in polygons {
            faces.push(PolyFace {
                corner_start: corner_verts.len(),
                corner_count: polygon.len(),
                normal: Vec3::ZERO,
                selected: false,
            });
            corner_verts.extend_from_slice(polygon);
        }

        let mut mesh = PolyMesh {
            vertex_selected: vec![false; positions.len()],
            positions,
            faces,
            corner_verts,
            attributes: Vec::new(),
            uv_layers: Vec::new(),
            active_uv: None,
            active_face: None,
            world: Mat4::IDENTITY,
            edit_mode: false,
            update_count: 0,
        };
        mesh.recalc_face_normals();
        mesh
    }

    /// Build a `PolyMesh` from a Bevy `Mesh`.
    ///
    /// Triangles that share an edge and lie in one plane are merged into a
    /// single polygon, so a quad split in two is textured as one face. Returns
    /// `None` if the mesh lacks positions or uses a non-triangle topology.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from(*p)).collect(),
            _ => return None,
        };

        let vertex_uvs: Option<Vec<Vec2>> = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(v)) => {
                Some(v.iter().map(|u| Vec2::from(*u)).collect())
            }
            _ => None,
        };

        let triangles: Vec<Vec<u32>> = match mesh.indices() {
            Some(Indices::U32(indices)) => indices.chunks_exact(3).map(|c| c.to_vec()).collect(),
            Some(Indices::U16(indices)) => indices
                .chunks_exact(3)
                .map(|c| c.iter().map(|&i| i as u32).collect())
                .collect(),
            None => (0..positions.len() as u32)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| c.to_vec())
                .collect(),
        };

        let polygons = merge_coplanar_triangles(&positions, &triangles);
        let mut poly = PolyMesh::from_polygons(positions, &polygons);
        if let Some(vertex_uvs) = vertex_uvs {
            let uvs = poly
                .corner_verts
                .iter()
                .map(|&v| vertex_uvs.get(v as usize).copied().unwrap_or(Vec2::ZERO))
                .collect();
            poly.uv_layers.push(UvLayer {
                name: "UVMap".to_string(),
                uvs,
            });
            poly.active_uv = Some(0);
        }
        Some(poly)
    }

    /// Write the active UV layer into a Bevy mesh built from this one.
    ///
    /// Bevy stores UVs per vertex. Corners of different faces sharing a vertex
    /// resolve to the last face that touches it.
    pub fn write_uvs_to_bevy(&self, mesh: &mut Mesh) {
        let Some(layer) = self.active_uv.and_then(|i| self.uv_layers.get(i)) else {
            return;
        };

        let mut vertex_uvs = vec![[0.0f32; 2]; self.positions.len()];
        for (corner, &v) in self.corner_verts.iter().enumerate() {
            if let (Some(slot), Some(uv)) = (vertex_uvs.get_mut(v as usize), layer.uvs.get(corner)) {
                *slot = [uv.x, uv.y];
            }
        }
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, vertex_uvs);
    }

    /// Write vertex positions and the active UV layer into the Bevy mesh this
    /// one was built from. Returns `false` when the vertex counts differ.
    pub fn write_to_bevy(&self, mesh: &mut Mesh) -> bool {
        if mesh.count_vertices() != self.positions.len() {
            return false;
        }
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        if mesh.primitive_topology() == PrimitiveTopology::TriangleList
            && mesh.contains_attribute(Mesh::ATTRIBUTE_NORMAL)
        {
            mesh.compute_normals();
        }
        self.write_uvs_to_bevy(mesh);
        true
    }

    /// Vertex indices of a face, in corner order.
    pub fn face_vertices(&self, face: FaceIndex) -> &[u32] {
        &self.corner_verts[self.faces[face].corners()]
    }

    /// Arithmetic mean of a face's corner positions.
    pub fn face_center(&self, face: FaceIndex) -> Vec3 {
        let verts = self.face_vertices(face);
        if verts.is_empty() {
            return Vec3::ZERO;
        }
        verts
            .iter()
            .map(|&v| self.positions[v as usize])
            .sum::<Vec3>()
            / verts.len() as f32
    }

    /// Select or deselect a face together with its vertices.
    pub fn select_face(&mut self, face: FaceIndex, selected: bool) {
        self.faces[face].selected = selected;
        let corners = self.faces[face].corners();
        for corner in corners {
            let v = self.corner_verts[corner] as usize;
            self.vertex_selected[v] = selected;
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for face in &mut self.faces {
            face.selected = selected;
        }
        self.vertex_selected.fill(selected);
    }

    fn attribute(&self, name: &str) -> Option<&MeshAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn domain_size(&self, domain: AttributeDomain) -> usize {
        match domain {
            AttributeDomain::Point => self.positions.len(),
            AttributeDomain::Face => self.faces.len(),
            AttributeDomain::Corner => self.corner_verts.len(),
        }
    }
}

/// Newell's method; robust for non-planar and concave polygons.
fn polygon_normal(points: impl Iterator<Item = Vec3> + Clone) -> Vec3 {
    let next = points.clone().cycle().skip(1);
    let mut normal = Vec3::ZERO;
    for (a, b) in points.zip(next) {
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal.normalize_or_zero()
}

/// Group edge-connected coplanar triangles into polygons.
///
/// Groups whose outline is not one simple loop stay as separate triangles.
fn merge_coplanar_triangles(positions: &[Vec3], triangles: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let normals: Vec<Vec3> = triangles
        .iter()
        .map(|tri| {
            polygon_normal(
                tri.iter()
                    .map(|&v| positions.get(v as usize).copied().unwrap_or(Vec3::ZERO)),
            )
        })
        .collect();

    let mut edge_owner: HashMap<(u32, u32), usize> = HashMap::new();
    for (index, tri) in triangles.iter().enumerate() {
        for (a, b) in triangle_edges(tri) {
            edge_owner.insert((a, b), index);
        }
    }

    let mut parent: Vec<usize> = (0..triangles.len()).collect();
    for (index, tri) in triangles.iter().enumerate() {
        if normals[index] == Vec3::ZERO {
            continue;
        }
        for (a, b) in triangle_edges(tri) {
            let Some(&other) = edge_owner.get(&(b, a)) else {
                continue;
            };
            if normals[index].dot(normals[other]) < 1.0 - AXIS_EPSILON {
                continue;
            }
            let (ra, rb) = (find_root(&mut parent, index), find_root(&mut parent, other));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for index in 0..triangles.len() {
        let root = find_root(&mut parent, index);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(index);
    }

    let mut polygons = Vec::with_capacity(groups.len());
    for group in groups {
        match outline_loop(triangles, &group) {
            Some(polygon) => polygons.push(polygon),
            None => polygons.extend(group.iter().map(|&i| triangles[i].clone())),
        }
    }
    polygons
}

fn triangle_edges(tri: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    (0..tri.len()).map(move |k| (tri[k], tri[(k + 1) % tri.len()]))
}

fn find_root(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

/// Outer edge loop of a triangle group, starting at the first vertex of its
/// first triangle that lies on the outline.
fn outline_loop(triangles: &[Vec<u32>], group: &[usize]) -> Option<Vec<u32>> {
    let first_tri = triangles.get(*group.first()?)?;
    if group.len() == 1 {
        return Some(first_tri.clone());
    }

    let edges: HashSet<(u32, u32)> = group
        .iter()
        .flat_map(move |&i| triangle_edges(&triangles[i]))
        .collect();
    let mut next: HashMap<u32, u32> = HashMap::new();
    for &(a, b) in &edges {
        if edges.contains(&(b, a)) {
            continue;
        }
        // a vertex visited twice means holes or a pinched outline
        if next.insert(a, b).is_some() {
            return None;
        }
    }

    let start = first_tri.iter().copied().find(|v| next.contains_key(v))?;
    let mut polygon = vec![start];
    let mut current = *next.get(&start)?;
    while current != start {
        if polygon.len() >= next.len() {
            return None;
        }
        polygon.push(current);
        current = *next.get(&current)?;
    }
    (polygon.len() == next.len()).then_some(polygon)
}

impl MeshHost for PolyMesh {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face_corners(&self, face: FaceIndex) -> Range<CornerIndex> {
        self.faces[face].corners()
    }

    fn corner_vertex(&self, corner: CornerIndex) -> VertexIndex {
        self.corner_verts[corner] as usize
    }

    fn face_normal(&self, face: FaceIndex) -> Vec3 {
        self.faces[face].normal
    }

    fn face_selected(&self, face: FaceIndex) -> bool {
        self.faces[face].selected
    }

    fn active_face(&self) -> Option<FaceIndex> {
        self.active_face.filter(|&f| f < self.faces.len())
    }

    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertex_position(&self, vertex: VertexIndex) -> Vec3 {
        self.positions[vertex]
    }

    fn set_vertex_position(&mut self, vertex: VertexIndex, position: Vec3) {
        self.positions[vertex] = position;
    }

    fn vertex_selected(&self, vertex: VertexIndex) -> bool {
        self.vertex_selected[vertex]
    }

    fn recalc_face_normals(&mut self) {
        for face in &mut self.faces {
            let points = self.corner_verts[face.corners()]
                .iter()
                .map(|&v| self.positions[v as usize]);
            face.normal = polygon_normal(points);
        }
    }

    fn world_matrix(&self) -> Mat4 {
        self.world
    }

    fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    fn attribute_info(&self, name: &str) -> Option<AttributeInfo> {
        self.attribute(name).map(|a| a.info)
    }

    fn add_attribute(&mut self, name: &str, info: AttributeInfo) {
        if self.attribute(name).is_some() {
            return;
        }
        let len = self.domain_size(info.domain) * info.kind.components();
        self.attributes.push(MeshAttribute {
            name: name.to_string(),
            info,
            values: vec![0.0; len],
        });
    }

    fn read_face_vec3(&self, name: &str) -> Option<Vec<Vec3>> {
        let attr = self
            .attribute(name)
            .filter(|a| a.info == AttributeInfo::FACE_FLOAT3)?;
        Some(
            attr.values
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect(),
        )
    }

    fn write_face_vec3(&mut self, name: &str, values: &[Vec3]) {
        let Some(attr) = self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.info == AttributeInfo::FACE_FLOAT3)
        else {
            return;
        };
        attr.values = values.iter().flat_map(|v| v.to_array()).collect();
    }

    fn uv_layer_count(&self) -> usize {
        self.uv_layers.len()
    }

    fn add_uv_layer(&mut self, name: &str) {
        self.uv_layers.push(UvLayer {
            name: name.to_string(),
            uvs: vec![Vec2::ZERO; self.corner_verts.len()],
        });
        if self.active_uv.is_none() {
            self.active_uv = Some(self.uv_layers.len() - 1);
        }
    }

    fn active_uv_layer(&self) -> Option<usize> {
        self.active_uv.filter(|&i| i < self.uv_layers.len())
    }

    fn read_uvs(&self) -> Option<Vec<Vec2>> {
        let layer = self.uv_layers.get(self.active_uv_layer()?)?;
        Some(layer.uvs.clone())
    }

    fn write_uvs(&mut self, uvs: &[Vec2]) {
        let Some(index) = self.active_uv_layer() else {
            return;
        };
        self.uv_layers[index].uvs = uvs.to_vec();
    }

    fn geometry_updated(&mut self) {
        self.update_count += 1;
    }
}
