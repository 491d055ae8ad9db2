use std::ops::{Index, IndexMut};

use meshview_core::mesh::MeshDataStage;

/// One value per [`MeshDataStage`], owned exclusively by the map.
#[derive(Debug, Clone, Default)]
pub struct StageMap<T> {
    slots: [T; 3],
}

impl<T> StageMap<T> {
    pub fn get(&self, stage: MeshDataStage) -> &T {
        &self.slots[stage.index()]
    }

    pub fn get_mut(&mut self, stage: MeshDataStage) -> &mut T {
        &mut self.slots[stage.index()]
    }

    /// Iterates `(stage, value)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (MeshDataStage, &T)> {
        MeshDataStage::ALL.into_iter().zip(self.slots.iter())
    }
}

impl<T> Index<MeshDataStage> for StageMap<T> {
    type Output = T;

    fn index(&self, stage: MeshDataStage) -> &T {
        self.get(stage)
    }
}

impl<T> IndexMut<MeshDataStage> for StageMap<T> {
    fn index_mut(&mut self, stage: MeshDataStage) -> &mut T {
        self.get_mut(stage)
    }
}
