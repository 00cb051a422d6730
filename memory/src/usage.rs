//! Defines usage types for memory blocks.
//! See `MemoryUsage` and implementations for details.

use crate::memory::Properties;

/// Memory usage trait.
pub trait MemoryUsage {
    /// Properties memory type must have to be used at all.
    fn properties_required(&self) -> Properties;

    /// Get comparable fitness value for memory properties.
    /// Higher is better.
    /// Should return `None` if memory doesn't fit.
    fn memory_fitness(&self, properties: Properties) -> Option<u8>;
}

impl<U> MemoryUsage for &U
where
    U: MemoryUsage + ?Sized,
{
    fn properties_required(&self) -> Properties {
        (**self).properties_required()
    }

    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        (**self).memory_fitness(properties)
    }
}

/// Packs preferences into fitness value.
/// Earlier preferences weigh more than all later ones combined.
fn fitness(properties: Properties, preferences: &[(Properties, bool)]) -> u8 {
    preferences
        .iter()
        .fold(0, |acc, &(flag, wanted)| {
            (acc << 1) | (properties.contains(flag) == wanted) as u8
        })
}

/// Full speed GPU access.
/// Optimal for render targets and persistent resources.
/// Avoid memory with host access.
#[derive(Clone, Copy, Debug)]
pub struct Data;

impl MemoryUsage for Data {
    #[inline]
    fn properties_required(&self) -> Properties {
        Properties::DEVICE_LOCAL
    }

    #[inline]
    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        if !properties.contains(Properties::DEVICE_LOCAL) {
            return None;
        }
        Some(fitness(
            properties,
            &[
                (Properties::HOST_VISIBLE, false),
                (Properties::LAZILY_ALLOCATED, false),
                (Properties::HOST_CACHED, false),
                (Properties::HOST_COHERENT, false),
            ],
        ))
    }
}

/// CPU to GPU data flow with update commands.
/// Used for dynamic buffer data, typically constant buffers.
/// Host access is guaranteed.
/// Prefers memory with fast GPU access.
#[derive(Clone, Copy, Debug)]
pub struct Dynamic;

impl MemoryUsage for Dynamic {
    #[inline]
    fn properties_required(&self) -> Properties {
        Properties::HOST_VISIBLE
    }

    #[inline]
    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        host_access(properties)?;
        Some(fitness(
            properties,
            &[
                (Properties::DEVICE_LOCAL, true),
                (Properties::HOST_COHERENT, true),
                (Properties::HOST_CACHED, false),
            ],
        ))
    }
}

/// CPU to GPU data flow with mapping.
/// Used for staging data before copying to the `Data` memory.
/// Host access is guaranteed.
#[derive(Clone, Copy, Debug)]
pub struct Upload;

impl MemoryUsage for Upload {
    #[inline]
    fn properties_required(&self) -> Properties {
        Properties::HOST_VISIBLE
    }

    #[inline]
    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        host_access(properties)?;
        Some(fitness(
            properties,
            &[
                (Properties::DEVICE_LOCAL, false),
                (Properties::HOST_COHERENT, true),
                (Properties::HOST_CACHED, false),
            ],
        ))
    }
}

/// GPU to CPU data flow with mapping.
/// Used for copying data from `Data` memory to be read by the host.
/// Host access is guaranteed.
#[derive(Clone, Copy, Debug)]
pub struct Download;

impl MemoryUsage for Download {
    #[inline]
    fn properties_required(&self) -> Properties {
        Properties::HOST_VISIBLE
    }

    #[inline]
    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        host_access(properties)?;
        Some(fitness(
            properties,
            &[
                (Properties::DEVICE_LOCAL, false),
                (Properties::HOST_CACHED, true),
                (Properties::HOST_COHERENT, true),
            ],
        ))
    }
}

/// Host-visible memory that can actually be mapped.
fn host_access(properties: Properties) -> Option<()> {
    if properties.host_visible() && !properties.contains(Properties::LAZILY_ALLOCATED) {
        Some(())
    } else {
        None
    }
}

/// Dynamic value that specify memory usage flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryUsageValue {
    /// Runtime counterpart for `Data`.
    Data,
    /// Runtime counterpart for `Dynamic`.
    Dynamic,
    /// Runtime counterpart for `Upload`.
    Upload,
    /// Runtime counterpart for `Download`.
    Download,
}

impl MemoryUsage for MemoryUsageValue {
    #[inline]
    fn properties_required(&self) -> Properties {
        match self {
            MemoryUsageValue::Data => Data.properties_required(),
            MemoryUsageValue::Dynamic => Dynamic.properties_required(),
            MemoryUsageValue::Upload => Upload.properties_required(),
            MemoryUsageValue::Download => Download.properties_required(),
        }
    }

    #[inline]
    fn memory_fitness(&self, properties: Properties) -> Option<u8> {
        match self {
            MemoryUsageValue::Data => Data.memory_fitness(properties),
            MemoryUsageValue::Dynamic => Dynamic.memory_fitness(properties),
            MemoryUsageValue::Upload => Upload.memory_fitness(properties),
            MemoryUsageValue::Download => Download.memory_fitness(properties),
        }
    }
}
