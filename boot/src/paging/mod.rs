/// Identity-mapped 4-level page tables for the long-mode switch.
///
/// The tables are built into a caller-provided slice of entries that backs the
/// reserved physical region starting at `base`. Entries store physical
/// addresses computed from `base`, while all writes go through slice indices,
/// so nothing outside the slice is ever touched.
///
/// Construction order: plan (all checks) → zero the whole span →
/// PT → PD → PDPT → PML4 slot 0.
mod entry;
mod layout;

pub use entry::{EntryFlags, PageTableEntry, ADDR_MASK};
pub use layout::{Level, TableCounts, TableLayout, MAX_EXTENT};

use crate::addr::PhysAddr;
use crate::config::{ENTRIES_PER_TABLE, PAGE_SIZE};
use crate::error::BootError;
use crate::memmap::RamExtent;

/// A finished hierarchy and the region it lives in.
pub struct PageTables<'a> {
    layout: TableLayout,
    entries: &'a [PageTableEntry],
}

impl<'a> PageTables<'a> {
    /// Build the identity map of `[0, extent)` into `region`, whose first
    /// entry sits at physical address `base`.
    pub fn build(
        region: &'a mut [PageTableEntry],
        base: PhysAddr,
        extent: RamExtent,
    ) -> Result<Self, BootError> {
        let layout = TableLayout::new(base, extent)?;
        let needed = layout.total_entries();
        let available = region.len() as u64;
        if needed > available {
            return Err(BootError::RegionTooSmall { needed, available });
        }

        let entries = &mut region[..needed as usize];
        entries.fill(PageTableEntry::empty());

        let counts = layout.counts();
        let pt = layout.start(Level::Page);
        let pd = layout.start(Level::Directory);
        let pdpt = layout.start(Level::DirectoryPointer);
        let pml4 = layout.start(Level::Root);

        for p in 0..counts.pages {
            entries[(pt + p) as usize].set(PhysAddr::new(p * PAGE_SIZE), EntryFlags::IDENTITY);
        }
        for t in 0..counts.tables {
            let table = layout.phys_of(pt + t * ENTRIES_PER_TABLE);
            entries[(pd + t) as usize].set(table, EntryFlags::IDENTITY);
        }
        for d in 0..counts.directories {
            let directory = layout.phys_of(pd + d * ENTRIES_PER_TABLE);
            entries[(pdpt + d) as usize].set(directory, EntryFlags::IDENTITY);
        }
        entries[pml4 as usize].set(layout.phys_of(pdpt), EntryFlags::IDENTITY);

        Ok(Self { layout, entries })
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn counts(&self) -> TableCounts {
        self.layout.counts()
    }

    /// Physical address of the PML4, the value for CR3.
    pub fn root(&self) -> PhysAddr {
        self.layout.root()
    }

    /// All entries of one level, including unused slots.
    pub fn level(&self, level: Level) -> &[PageTableEntry] {
        let start = self.layout.start(level) as usize;
        &self.entries[start..start + self.layout.len(level) as usize]
    }

    /// Every entry of the hierarchy, in region order.
    pub fn entries(&self) -> &[PageTableEntry] {
        self.entries
    }

    /// Entry at physical address `addr`, if it belongs to the hierarchy.
    fn entry_at(&self, addr: PhysAddr) -> Option<PageTableEntry> {
        let index = self.layout.index_of(addr)?;
        self.entries.get(index as usize).copied()
    }

    /// PT entry covering `addr`, present or not. `None` if an upper level is
    /// not present or points outside the hierarchy.
    pub fn leaf(&self, addr: u64) -> Option<PageTableEntry> {
        let mut table = self.root();

        for level in [Level::Root, Level::DirectoryPointer, Level::Directory] {
            let entry = self.entry_at(slot_of(table, level, addr))?;
            if !entry.is_present() {
                return None; // Intermediate table not present
            }
            table = entry.address();
        }

        self.entry_at(slot_of(table, Level::Page, addr))
    }

    /// Walk PML4 → PDPT → PD → PT like the MMU would and return the physical
    /// address `addr` resolves to.
    pub fn translate(&self, addr: u64) -> Option<PhysAddr> {
        let pte = self.leaf(addr).filter(|e| e.is_present())?;
        Some(pte.address().offset(addr & (PAGE_SIZE - 1)))
    }
}

/// Physical address of the entry for `addr` in the `level` table at `table`.
fn slot_of(table: PhysAddr, level: Level, addr: u64) -> PhysAddr {
    table.offset((level.index_of(addr) * core::mem::size_of::<PageTableEntry>()) as u64)
}
