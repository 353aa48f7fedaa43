/// Fatal conditions of the protected-mode stage.
///
/// All of these are detected before anything is written to the page-table
/// region. There is no recovery: the entry point reports and halts.
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The E820 map claims more entries than its buffer holds.
    MapTooLarge { size: u32 },
    /// More than one PML4 slot (512 GiB) would be needed.
    ExtentTooLarge { extent: u64 },
    /// The reserved region cannot hold the computed tables (in entries).
    RegionTooSmall { needed: u64, available: u64 },
    /// Page tables must start on a 4 KiB boundary.
    Misaligned { base: u64 },
    /// The trampoline only takes a 32-bit CR3 value.
    RootAbove4GiB { root: u64 },
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::MapTooLarge { size } => {
                write!(f, "E820 map has {} entries, buffer holds {}", size, crate::memmap::MAX_REGIONS)
            }
            BootError::ExtentTooLarge { extent } => {
                write!(f, "RAM extent {:#x} exceeds the 512 GiB identity map", extent)
            }
            BootError::RegionTooSmall { needed, available } => {
                write!(f, "page tables need {} entries, region holds {}", needed, available)
            }
            BootError::Misaligned { base } => write!(f, "page table base {:#x} not 4 KiB aligned", base),
            BootError::RootAbove4GiB { root } => write!(f, "PML4 at {:#x} does not fit in 32 bits", root),
        }
    }
}
