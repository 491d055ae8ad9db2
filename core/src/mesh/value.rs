/// A single decoded vertex component.
///
/// Normalized, scaled, half and depth components all decode to
/// [`Float`](ComponentValue::Float); integer types keep their signedness so
/// they can be displayed as hex or decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentValue {
    Float(f32),
    Double(f64),
    UInt(u32),
    SInt(i32),
}

impl ComponentValue {
    /// Lossy conversion used for spatial bounds.
    pub fn as_f32(&self) -> f32 {
        match *self {
            Self::Float(v) => v,
            Self::Double(v) => v as f32,
            Self::UInt(v) => v as f32,
            Self::SInt(v) => v as f32,
        }
    }

    /// Lossy conversion to `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => v as f64,
            Self::Double(v) => v,
            Self::UInt(v) => v as f64,
            Self::SInt(v) => v as f64,
        }
    }
}

impl From<f32> for ComponentValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for ComponentValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<u32> for ComponentValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<i32> for ComponentValue {
    fn from(v: i32) -> Self {
        Self::SInt(v)
    }
}
