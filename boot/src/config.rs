//! Build-time layout of the protected-mode stage.
//!
//! These addresses are shared with the real-mode stage (which fills the E820
//! buffer) and with the trampoline (which owns `pml4_ptr32`). Changing one
//! here means changing it there too.

/// Size of a 4 KiB page / page table.
pub const PAGE_SIZE: u64 = 4096;

/// Entries in one table of any level.
pub const ENTRIES_PER_TABLE: u64 = 512;

/// Where the real-mode stage leaves the E820 map (`MemoryMap` image).
pub const E820_LOC: u64 = 0x0000_8000;

/// Base of the region reserved for page tables. PML4 lands here.
pub const PT_LOC: u64 = 0x0010_0000;

/// Largest RAM extent the boot region is sized for.
pub const MAX_BOOT_EXTENT: u64 = 8 * 1024 * 1024 * 1024;

/// Bytes reserved at `PT_LOC`: the full hierarchy for `MAX_BOOT_EXTENT`,
/// 0x100_A000 (a little over 16 MiB).
pub const PT_REGION_LIMIT: u64 = table_bytes_for(MAX_BOOT_EXTENT);

/// Bytes of PML4 + PDPT + PDs + PTs needed to identity map `[0, extent)`.
pub const fn table_bytes_for(extent: u64) -> u64 {
    let pages = extent.div_ceil(PAGE_SIZE);
    let tables = pages.div_ceil(ENTRIES_PER_TABLE);
    let directories = tables.div_ceil(ENTRIES_PER_TABLE);
    (2 + directories + tables) * ENTRIES_PER_TABLE * 8
}

/// Whether COM1 diagnostics are compiled in.
pub const DEBUG_PRINT: bool = cfg!(feature = "debug-print");

/// Whether non-usable E820 regions are dropped before sorting.
pub const USABLE_ONLY: bool = cfg!(feature = "usable-only");
