/// x86_64 page table entry, as written for the long-mode switch.
///
/// Bits 0..12 hold flags (only PRESENT and WRITABLE are ever set here),
/// bits 12..52 the 4 KiB aligned physical address of a frame or next table.
use core::fmt;

use bitflags::bitflags;

use crate::addr::PhysAddr;

/// Address bits 51:12.
pub const ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EntryFlags: u64 {
        const PRESENT  = 1 << 0;
        const WRITABLE = 1 << 1;
    }
}

impl EntryFlags {
    /// What every entry of the identity map carries.
    pub const IDENTITY: Self = Self::PRESENT.union(Self::WRITABLE);
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u64);

static_assertions::const_assert_eq!(core::mem::size_of::<PageTableEntry>(), 8);

impl PageTableEntry {
    /// Not present, no address.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn new(addr: PhysAddr, flags: EntryFlags) -> Self {
        Self((addr.as_u64() & ADDR_MASK) | flags.bits())
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_present(self) -> bool {
        self.0 & EntryFlags::PRESENT.bits() != 0
    }

    #[inline]
    pub fn is_unused(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn address(self) -> PhysAddr {
        PhysAddr::new(self.0 & ADDR_MASK)
    }

    #[inline]
    pub fn flags(self) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.0)
    }

    /// Replace the entry. Low address bits are dropped, not folded into flags.
    #[inline]
    pub fn set(&mut self, addr: PhysAddr, flags: EntryFlags) {
        *self = Self::new(addr, flags);
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTableEntry({:#x}, {:?})", self.address().as_u64(), self.flags())
    }
}
