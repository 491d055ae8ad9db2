/// Pipeline stage a mesh dataset is captured from.
///
/// Each stage has its own addressing rules: the input stage reads the
/// application's vertex buffers through the draw's index buffer, the two
/// post-transform stages read engine-produced buffers through the engine's
/// own remap indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshDataStage {
    /// Pre-transform vertex input.
    VertexInput,
    /// Post vertex shader.
    VertexOutput,
    /// Post geometry/tessellation.
    GeometryOutput,
}

impl MeshDataStage {
    /// All stages in pipeline order.
    pub const ALL: [MeshDataStage; 3] = [
        MeshDataStage::VertexInput,
        MeshDataStage::VertexOutput,
        MeshDataStage::GeometryOutput,
    ];

    /// Dense index of the stage, suitable for array storage.
    pub fn index(&self) -> usize {
        match self {
            Self::VertexInput => 0,
            Self::VertexOutput => 1,
            Self::GeometryOutput => 2,
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VertexInput => "VS Input",
            Self::VertexOutput => "VS Output",
            Self::GeometryOutput => "GS/DS Output",
        }
    }

    /// Whether data for this stage comes from the engine's post-transform capture.
    pub fn is_post_transform(&self) -> bool {
        !matches!(self, Self::VertexInput)
    }
}

impl std::fmt::Display for MeshDataStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        for (i, stage) in MeshDataStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn post_transform_stages() {
        assert!(!MeshDataStage::VertexInput.is_post_transform());
        assert!(MeshDataStage::VertexOutput.is_post_transform());
        assert!(MeshDataStage::GeometryOutput.is_post_transform());
    }
}
