use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
};

use ldraw_formats::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Resolves part assets to opaque handles; `None` marks a missing resource.
pub trait GeometryProvider {
    /// Resolves a part asset (already normalized with `part_file_name`).
    fn load_geometry(&self, file_name: &str) -> Option<MeshHandle>;

    /// Resolves the material baked for `color`.
    fn load_material(&self, color: Rgb) -> Option<MaterialHandle>;
}

/// Provider backed by an optional allow-list of part files. Handles are
/// interned so the same asset always maps to the same handle.
#[derive(Debug, Default)]
pub struct CatalogGeometry {
    known_parts: Option<BTreeSet<String>>,
    meshes: RefCell<HashMap<String, MeshHandle>>,
    materials: RefCell<HashMap<String, MaterialHandle>>,
}

impl CatalogGeometry {
    /// Resolves every part file it is asked for.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Resolves only the listed part files.
    pub fn with_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_parts: Some(parts.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.borrow().len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.borrow().len()
    }
}

impl GeometryProvider for CatalogGeometry {
    fn load_geometry(&self, file_name: &str) -> Option<MeshHandle> {
        if let Some(known) = &self.known_parts {
            if !known.contains(file_name) {
                return None;
            }
        }
        let mut meshes = self.meshes.borrow_mut();
        let next = MeshHandle(meshes.len() as u32);
        Some(*meshes.entry(file_name.to_string()).or_insert(next))
    }

    fn load_material(&self, color: Rgb) -> Option<MaterialHandle> {
        if !(color.r.is_finite() && color.g.is_finite() && color.b.is_finite()) {
            return None;
        }
        let mut materials = self.materials.borrow_mut();
        let next = MaterialHandle(materials.len() as u32);
        Some(*materials.entry(color.material_key()).or_insert(next))
    }
}
