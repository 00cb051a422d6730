use {
    crate::memory::Properties,
    colorful::{core::color_string::CString, Color, Colorful as _},
};

/// Memory utilization stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUtilization {
    /// Bytes of memory objects allocated from the device.
    pub used: u64,
    /// Bytes requested by live allocations.
    pub effective: u64,
}

impl MemoryUtilization {
    /// Fraction of used memory that serves allocations, in permyriad.
    pub fn efficiency(&self) -> u64 {
        if self.used > 0 {
            self.effective * 10000 / self.used
        } else {
            10000
        }
    }
}

/// Memory utilization of one heap.
#[derive(Clone, Copy, Debug)]
pub struct MemoryHeapUtilization {
    /// Utilization.
    pub utilization: MemoryUtilization,

    /// Memory heap size.
    pub size: u64,
}

/// Memory utilization of one type.
#[derive(Clone, Copy, Debug)]
pub struct MemoryTypeUtilization {
    /// Utilization.
    pub utilization: MemoryUtilization,

    /// Memory type properties.
    pub properties: Properties,

    /// Index of heap this memory type uses.
    pub heap_index: usize,

    /// Number of buddy blocks alive.
    pub blocks: usize,
}

/// Total memory utilization.
#[derive(Clone, Debug)]
pub struct TotalMemoryUtilization {
    /// Utilization by types.
    pub types: Vec<MemoryTypeUtilization>,

    /// Utilization by heaps.
    pub heaps: Vec<MemoryHeapUtilization>,
}

const BAR: usize = 40;

impl std::fmt::Display for TotalMemoryUtilization {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(fmt, "Memory utilization")?;
        for (index, heap) in self.heaps.iter().enumerate() {
            let permyriad = permyriad(heap.utilization.used, heap.size);
            let fill = (permyriad as usize * BAR / 10000).min(BAR);
            let bar = ("#".repeat(fill) + &".".repeat(BAR - fill))
                .gradient_with_color(Color::Green, Color::Red);

            writeln!(
                fmt,
                "Heap {} [{}] {} / {} ({}, efficiency {})",
                index.to_string().magenta(),
                bar,
                megabytes(heap.utilization.used),
                megabytes(heap.size),
                load(permyriad),
                efficiency(heap.utilization.efficiency()),
            )?;

            for (type_index, ty) in self
                .types
                .iter()
                .enumerate()
                .filter(|(_, ty)| ty.heap_index == index)
            {
                writeln!(
                    fmt,
                    "  type {:>2}: {:>8} in {} blocks ({}, efficiency {}) {:?}",
                    type_index,
                    megabytes(ty.utilization.used),
                    ty.blocks,
                    load(permyriad_of(ty.utilization.used, heap.size)),
                    efficiency(ty.utilization.efficiency()),
                    ty.properties,
                )?;
            }
        }
        Ok(())
    }
}

fn megabytes(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}

fn permyriad(part: u64, whole: u64) -> u64 {
    permyriad_of(part, whole).min(10000)
}

fn permyriad_of(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        (u128::from(part) * 10000 / u128::from(whole)) as u64
    }
}

fn percent(permyriad: u64) -> String {
    format!("{:>3}.{:02}%", permyriad / 100, permyriad % 100)
}

/// Colored by pressure: the fuller the redder.
fn load(permyriad: u64) -> CString {
    let text = percent(permyriad);
    match permyriad {
        7501..=u64::MAX => text.red(),
        5001..=7500 => text.yellow(),
        2501..=5000 => text.green(),
        _ => text.white(),
    }
}

/// Colored by waste: the less effective the redder.
fn efficiency(permyriad: u64) -> CString {
    let text = percent(permyriad);
    match permyriad {
        9001..=u64::MAX => text.white(),
        7501..=9000 => text.green(),
        5001..=7500 => text.yellow(),
        _ => text.red(),
    }
}
