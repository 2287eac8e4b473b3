use super::types::ShaderType;

/// Byte layout of one vertex record: an ordered list of typed attributes.
///
/// Attribute `i` is fed to shader input location `i`. The layout must match
/// the `#[repr(C)]` vertex struct uploaded into the buffer it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    attributes: Vec<ShaderType>,
}

impl AttributeLayout {
    pub fn new(attributes: impl Into<Vec<ShaderType>>) -> Self {
        Self {
            attributes: attributes.into(),
        }
    }

    pub fn attributes(&self) -> &[ShaderType] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Size of one vertex record in bytes.
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.size_bytes()).sum()
    }

    /// `(slot, type, byte offset)` for each attribute, in declared order.
    pub fn offsets(&self) -> impl Iterator<Item = (u32, ShaderType, u32)> + '_ {
        self.attributes
            .iter()
            .scan(0u32, |offset, ty| {
                let at = *offset;
                *offset += ty.size_bytes();
                Some((*ty, at))
            })
            .enumerate()
            .map(|(slot, (ty, offset))| (slot as u32, ty, offset))
    }
}
