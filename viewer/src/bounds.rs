use meshview_core::mesh::{ComponentValue, Layout};

/// Axis-aligned min/max of one element over every decoded row.
///
/// Only the first three components count; missing ones read as 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
    /// Number of values folded in.
    pub samples: usize,
}

impl ElementBounds {
    fn from_point(point: [f32; 3]) -> Self {
        Self {
            min: point,
            max: point,
            samples: 1,
        }
    }

    fn include(&mut self, point: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
        self.samples += 1;
    }

    /// Center of the box.
    pub fn center(&self) -> [f32; 3] {
        [0, 1, 2].map(|axis| (self.min[axis] + self.max[axis]) * 0.5)
    }
}

/// Running per-element bounds, filled by the row decoder.
#[derive(Debug, Clone, Default)]
pub struct BoundsAccumulator {
    elements: Vec<Option<ElementBounds>>,
}

impl BoundsAccumulator {
    pub fn new(element_count: usize) -> Self {
        Self {
            elements: vec![None; element_count],
        }
    }

    /// Fold one decoded value of `element` into its bounds.
    pub fn include(&mut self, element: usize, values: &[ComponentValue]) {
        if element >= self.elements.len() {
            self.elements.resize(element + 1, None);
        }
        let point = [0, 1, 2].map(|i| values.get(i).map_or(0.0, ComponentValue::as_f32));
        let slot = &mut self.elements[element];
        match slot {
            Some(bounds) => bounds.include(point),
            None => *slot = Some(ElementBounds::from_point(point)),
        }
    }

    pub fn finish(self) -> MeshBounds {
        MeshBounds {
            elements: self.elements,
        }
    }
}

/// Final per-element bounds of a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBounds {
    elements: Vec<Option<ElementBounds>>,
}

impl MeshBounds {
    /// Bounds of `element`, `None` if no in-range value was decoded.
    pub fn element(&self, element: usize) -> Option<ElementBounds> {
        self.elements.get(element).copied().flatten()
    }

    /// Bounds of the layout's position element.
    pub fn position(&self, layout: &Layout) -> Option<ElementBounds> {
        self.element(layout.position_element()?)
    }
}
