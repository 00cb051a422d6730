//! Capability module docs.

/// Kind of queue command buffers are recorded for.
/// Also names the minimal queue kind a command requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueType {
    /// Graphics queue. Supports all commands.
    Graphics,

    /// Compute queue. Supports compute and transfer commands.
    Compute,

    /// Transfer queue. Supports only transfer commands.
    Transfer,
}

impl QueueType {
    /// All queue types.
    pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Transfer];

    /// Check if queue of this type can execute commands that require `required` queue type.
    pub fn supports(self, required: QueueType) -> bool {
        match (self, required) {
            (QueueType::Graphics, _) => true,
            (QueueType::Compute, QueueType::Compute)
            | (QueueType::Compute, QueueType::Transfer) => true,
            (QueueType::Transfer, QueueType::Transfer) => true,
            _ => false,
        }
    }
}

/// Family id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FamilyId {
    /// Family index as reported by the physical device.
    pub index: u32,
}

impl From<u32> for FamilyId {
    fn from(index: u32) -> Self {
        FamilyId { index }
    }
}
