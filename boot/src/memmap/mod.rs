/// E820 memory map as left by the real-mode stage.
///
/// The buffer at `E820_LOC` is a `MemoryMap` image: an entry count followed by
/// fixed-size 24-byte records. This stage only reorders records in place; it
/// never adds any. Dropping non-usable records happens only with the
/// `usable-only` feature.
use core::fmt;

use crate::config::USABLE_ONLY;
use crate::error::BootError;

/// Capacity of the E820 buffer.
pub const MAX_REGIONS: usize = 128;

/// E820 address range type. Kept as the raw firmware value so unknown types
/// survive untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct RegionKind(pub u32);

impl RegionKind {
    pub const USABLE: Self = Self(1);
    pub const RESERVED: Self = Self(2);
    pub const ACPI_RECLAIMABLE: Self = Self(3);
    pub const ACPI_NVS: Self = Self(4);
    pub const BAD_MEMORY: Self = Self(5);

    pub const fn is_usable(self) -> bool {
        self.0 == Self::USABLE.0
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::USABLE => "usable",
            Self::RESERVED => "reserved",
            Self::ACPI_RECLAIMABLE => "ACPI reclaimable",
            Self::ACPI_NVS => "ACPI NVS",
            Self::BAD_MEMORY => "bad memory",
            _ => "unknown",
        }
    }
}

impl fmt::Debug for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// One E820 record (ACPI 3.0 extended form).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryRegion {
    pub base: u64,
    pub length: u64,
    pub kind: RegionKind,
    pub acpi: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<MemoryRegion>(), 24);

impl MemoryRegion {
    pub const EMPTY: Self = Self { base: 0, length: 0, kind: RegionKind(0), acpi: 0 };

    pub const fn new(base: u64, length: u64, kind: RegionKind) -> Self {
        Self { base, length, kind, acpi: 0 }
    }

    /// One past the last byte of the region.
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }
}

/// Image of the E820 buffer.
#[repr(C)]
pub struct MemoryMap {
    size: u32,
    _reserved: u32,
    entries: [MemoryRegion; MAX_REGIONS],
}

static_assertions::const_assert_eq!(core::mem::size_of::<MemoryMap>(), 8 + 24 * MAX_REGIONS);

/// Address one byte past the highest reported region, usable or not.
/// This is what gets identity mapped; it is an upper bound on usable RAM.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct RamExtent(pub u64);

impl RamExtent {
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RamExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RamExtent({:#x})", self.0)
    }
}

impl fmt::Display for RamExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} ({} MiB)", self.0, self.0 / (1024 * 1024))
    }
}

impl MemoryMap {
    pub const fn new() -> Self {
        Self { size: 0, _reserved: 0, entries: [MemoryRegion::EMPTY; MAX_REGIONS] }
    }

    /// Build a map from a list of records (host tools and tests).
    pub fn from_regions(regions: &[MemoryRegion]) -> Result<Self, BootError> {
        if regions.len() > MAX_REGIONS {
            return Err(BootError::MapTooLarge { size: regions.len() as u32 });
        }
        let mut map = Self::new();
        map.entries[..regions.len()].copy_from_slice(regions);
        map.size = regions.len() as u32;
        Ok(map)
    }

    /// Reinterpret the buffer the real-mode stage filled in.
    ///
    /// # Safety
    /// `addr` must point at a `MemoryMap` image that nothing else touches for
    /// the lifetime of the returned reference.
    pub unsafe fn from_phys<'a>(addr: crate::PhysAddr) -> &'a mut Self {
        unsafe { &mut *addr.as_ptr::<Self>() }
    }

    /// Entry count as reported by the real-mode stage.
    pub fn reported_size(&self) -> u32 {
        self.size
    }

    /// Number of valid entries, never past the buffer.
    pub fn len(&self) -> usize {
        (self.size as usize).min(MAX_REGIONS)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> &[MemoryRegion] {
        &self.entries[..self.len()]
    }

    pub fn entries_mut(&mut self) -> &mut [MemoryRegion] {
        let len = self.len();
        &mut self.entries[..len]
    }

    /// Reject a count the buffer cannot hold.
    pub fn validate(&self) -> Result<(), BootError> {
        if self.size as usize > MAX_REGIONS {
            return Err(BootError::MapTooLarge { size: self.size });
        }
        Ok(())
    }

    /// Sort by ascending base.
    ///
    /// Adjacent-swap passes until a pass swaps nothing. Each pass leaves the
    /// largest remaining base at the end, so the scanned prefix shrinks by one.
    /// Equal bases are never swapped, which keeps the sort stable.
    pub fn sort(&mut self) {
        let entries = self.entries_mut();
        let mut unsorted = entries.len();
        let mut swapped = true;

        while unsorted > 1 && swapped {
            swapped = false;
            for i in 0..unsorted - 1 {
                if entries[i].base > entries[i + 1].base {
                    entries.swap(i, i + 1);
                    swapped = true;
                }
            }
            unsorted -= 1;
        }
    }

    /// Highest `base + length` over all valid entries. Does not rely on order.
    pub fn ram_extent(&self) -> RamExtent {
        RamExtent(self.entries().iter().map(MemoryRegion::end).max().unwrap_or(0))
    }

    /// Drop every non-usable record, keeping the order of the rest.
    pub fn retain_usable(&mut self) {
        let len = self.len();
        let mut kept = 0;
        for i in 0..len {
            if self.entries[i].kind.is_usable() {
                self.entries[kept] = self.entries[i];
                kept += 1;
            }
        }
        for entry in &mut self.entries[kept..len] {
            *entry = MemoryRegion::EMPTY;
        }
        self.size = kept as u32;
    }

    /// Total length of usable records.
    pub fn usable_bytes(&self) -> u64 {
        self.entries()
            .iter()
            .filter(|e| e.kind.is_usable())
            .fold(0u64, |acc, e| acc.saturating_add(e.length))
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate, (optionally filter,) sort, then measure the map.
pub fn normalize(map: &mut MemoryMap) -> Result<RamExtent, BootError> {
    map.validate()?;
    if USABLE_ONLY {
        map.retain_usable();
    }
    map.sort();
    Ok(map.ram_extent())
}

#[cfg(test)]
mod tests;
