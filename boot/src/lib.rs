#![no_std]
// bbp protected-mode stage.
//
// Runs once, after the real-mode stage has stored the E820 map and before the
// long-mode trampoline loads CR3:
// 1. Sort the E820 map and find the top of reported memory
// 2. Identity map everything below it with 4 KiB pages
// 3. Hand the PML4 address to the trampoline through `pml4_ptr32`

#[cfg(test)]
extern crate alloc;

pub mod addr;
pub mod config;
pub mod entry;
pub mod error;
pub mod memmap;
pub mod paging;
pub mod serial;

pub use addr::PhysAddr;
pub use entry::{bootstrap, Handoff};
pub use error::BootError;
pub use memmap::{normalize, MemoryMap, MemoryRegion, RamExtent, RegionKind};
pub use paging::{PageTableEntry, PageTables, TableCounts, TableLayout};
