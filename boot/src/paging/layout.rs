/// Sizing and placement of the four table levels.
///
/// Region layout (entry offsets, low address first):
///   [PML4]  512 entries, only slot 0 used
///   [PDPT]  512 entries, one per GiB
///   [PD]    directories * 512 entries, one per 2 MiB
///   [PT]    tables * 512 entries, one per 4 KiB page
use crate::addr::PhysAddr;
use crate::config::{ENTRIES_PER_TABLE, PAGE_SIZE};
use crate::error::BootError;
use crate::memmap::RamExtent;

use super::entry::PageTableEntry;

const ENTRY_SIZE: u64 = core::mem::size_of::<PageTableEntry>() as u64;

/// Largest extent one PML4 slot can map: 512 PDPT entries of 1 GiB.
pub const MAX_EXTENT: u64 = ENTRIES_PER_TABLE * Level::DirectoryPointer.span();

/// Translation level, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Root,
    DirectoryPointer,
    Directory,
    Page,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Root, Level::DirectoryPointer, Level::Directory, Level::Page];

    const fn shift(self) -> u32 {
        match self {
            Level::Root => 39,
            Level::DirectoryPointer => 30,
            Level::Directory => 21,
            Level::Page => 12,
        }
    }

    /// Bytes covered by one entry at this level.
    pub const fn span(self) -> u64 {
        1 << self.shift()
    }

    /// Slot used for `addr` inside a table of this level.
    pub const fn index_of(self, addr: u64) -> usize {
        ((addr >> self.shift()) & (ENTRIES_PER_TABLE - 1)) as usize
    }
}

/// How many entries each lower level needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    /// PT entries, one per 4 KiB page.
    pub pages: u64,
    /// PD entries, one per full or partial page table.
    pub tables: u64,
    /// PDPT entries, one per full or partial page directory.
    pub directories: u64,
}

impl TableCounts {
    pub const fn for_extent(extent: RamExtent) -> Self {
        let pages = extent.bytes().div_ceil(PAGE_SIZE);
        let tables = pages.div_ceil(ENTRIES_PER_TABLE);
        let directories = tables.div_ceil(ENTRIES_PER_TABLE);
        Self { pages, tables, directories }
    }
}

/// Entry offsets of each level inside the reserved region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    base: PhysAddr,
    counts: TableCounts,
}

impl TableLayout {
    /// Plan the tables for `extent` at `base`. Fails before anything is
    /// written if the plan cannot be honoured.
    pub fn new(base: PhysAddr, extent: RamExtent) -> Result<Self, BootError> {
        if extent.bytes() > MAX_EXTENT {
            return Err(BootError::ExtentTooLarge { extent: extent.bytes() });
        }
        if !base.is_page_aligned() {
            return Err(BootError::Misaligned { base: base.as_u64() });
        }
        if base.as_u64() > u32::MAX as u64 {
            return Err(BootError::RootAbove4GiB { root: base.as_u64() });
        }
        Ok(Self { base, counts: TableCounts::for_extent(extent) })
    }

    pub fn base(&self) -> PhysAddr {
        self.base
    }

    pub fn counts(&self) -> TableCounts {
        self.counts
    }

    /// First entry of `level`.
    pub fn start(&self, level: Level) -> u64 {
        match level {
            Level::Root => 0,
            Level::DirectoryPointer => ENTRIES_PER_TABLE,
            Level::Directory => 2 * ENTRIES_PER_TABLE,
            Level::Page => (2 + self.counts.directories) * ENTRIES_PER_TABLE,
        }
    }

    /// Entries reserved for `level`, including unused tail slots.
    pub fn len(&self, level: Level) -> u64 {
        match level {
            Level::Root | Level::DirectoryPointer => ENTRIES_PER_TABLE,
            Level::Directory => self.counts.directories * ENTRIES_PER_TABLE,
            Level::Page => self.counts.tables * ENTRIES_PER_TABLE,
        }
    }

    /// Entries the whole hierarchy occupies.
    pub fn total_entries(&self) -> u64 {
        self.start(Level::Page) + self.len(Level::Page)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_entries() * ENTRY_SIZE
    }

    /// Physical address of entry slot `index` of the region.
    pub fn phys_of(&self, index: u64) -> PhysAddr {
        self.base.offset(index * ENTRY_SIZE)
    }

    /// Region index of the entry at physical address `addr`, if it lies in
    /// the hierarchy.
    pub fn index_of(&self, addr: PhysAddr) -> Option<u64> {
        let offset = addr.as_u64().checked_sub(self.base.as_u64())?;
        let index = offset / ENTRY_SIZE;
        (offset % ENTRY_SIZE == 0 && index < self.total_entries()).then_some(index)
    }

    /// Physical address of the PML4.
    pub fn root(&self) -> PhysAddr {
        self.phys_of(self.start(Level::Root))
    }
}
