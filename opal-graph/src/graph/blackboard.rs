use fnv::FnvHashMap;
use opal_api::OpalExtents2D;

/// A value stored on the [`Blackboard`]. String values own their storage; handing out borrowed
/// pointers to per-frame strings is how use-after-free bugs happen.
#[derive(Debug, Clone, PartialEq)]
pub enum BlackboardValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Extents(OpalExtents2D),
    String(String),
}

impl From<bool> for BlackboardValue {
    fn from(value: bool) -> Self {
        BlackboardValue::Bool(value)
    }
}

impl From<i64> for BlackboardValue {
    fn from(value: i64) -> Self {
        BlackboardValue::Int(value)
    }
}

impl From<u64> for BlackboardValue {
    fn from(value: u64) -> Self {
        BlackboardValue::UInt(value)
    }
}

impl From<f64> for BlackboardValue {
    fn from(value: f64) -> Self {
        BlackboardValue::Float(value)
    }
}

impl From<OpalExtents2D> for BlackboardValue {
    fn from(value: OpalExtents2D) -> Self {
        BlackboardValue::Extents(value)
    }
}

impl From<String> for BlackboardValue {
    fn from(value: String) -> Self {
        BlackboardValue::String(value)
    }
}

impl From<&str> for BlackboardValue {
    fn from(value: &str) -> Self {
        BlackboardValue::String(value.to_string())
    }
}

/// A frame-scoped key/value side-channel for passing auxiliary values (computed dimensions,
/// toggles, ...) between passes outside the resource-dependency graph. Last writer wins per key;
/// cleared every frame at reset.
#[derive(Default)]
pub struct Blackboard {
    values: FnvHashMap<&'static str, BlackboardValue>,
}

impl Blackboard {
    pub fn write(
        &mut self,
        key: &'static str,
        value: impl Into<BlackboardValue>,
    ) {
        self.values.insert(key, value.into());
    }

    pub fn read(
        &self,
        key: &str,
    ) -> Option<&BlackboardValue> {
        self.values.get(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
