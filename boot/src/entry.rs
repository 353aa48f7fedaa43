/// Protected-mode stage entry.
///
/// `bootstrap` is the whole stage as a pure function over borrowed memory, so
/// it runs the same on the host. `main32` (target builds only) binds it to the
/// fixed physical locations and publishes CR3 for the trampoline.
use crate::addr::PhysAddr;
use crate::error::BootError;
use crate::memmap::{self, MemoryMap, RamExtent};
use crate::paging::{PageTableEntry, PageTables, TableCounts};

/// What the trampoline and the log need from this stage.
pub struct Handoff<'a> {
    pub extent: RamExtent,
    pub tables: PageTables<'a>,
}

impl Handoff<'_> {
    pub fn counts(&self) -> TableCounts {
        self.tables.counts()
    }

    /// Value for `pml4_ptr32`. `TableLayout` refuses roots above 4 GiB.
    pub fn cr3(&self) -> u32 {
        self.tables.root().as_u64() as u32
    }
}

/// Normalize the E820 map, then identity map everything below its top.
pub fn bootstrap<'a>(
    map: &mut MemoryMap,
    region: &'a mut [PageTableEntry],
    base: PhysAddr,
) -> Result<Handoff<'a>, BootError> {
    let extent = memmap::normalize(map)?;
    let tables = PageTables::build(region, base, extent)?;
    Ok(Handoff { extent, tables })
}

#[cfg(all(not(test), target_os = "none", any(target_arch = "x86", target_arch = "x86_64")))]
mod target {
    use super::*;
    use crate::config::{E820_LOC, PT_LOC, PT_REGION_LIMIT};
    use crate::{boot_println, serial};

    extern "C" {
        /// Defined by the trampoline; loaded into CR3 after we return.
        static mut pml4_ptr32: u32;
    }

    fn halt() -> ! {
        loop {
            unsafe { core::arch::asm!("cli; hlt", options(nomem, nostack)); }
        }
    }

    fn dump_map(map: &MemoryMap) {
        for (i, e) in map.entries().iter().enumerate() {
            boot_println!("[e820] {:2}: {:#014x}..{:#014x} {}", i, e.base, e.end(), e.kind.name());
        }
        boot_println!("[e820] {} MiB usable", map.usable_bytes() / (1024 * 1024));
    }

    /// Called by the real-mode stage once the E820 map is in place.
    #[no_mangle]
    pub extern "C" fn main32() {
        serial::init();
        boot_println!("bbp: protected mode");

        // Nothing else runs yet: both regions are ours until the trampoline.
        let map = unsafe { MemoryMap::from_phys(PhysAddr::new(E820_LOC)) };
        let region = unsafe {
            core::slice::from_raw_parts_mut(
                PhysAddr::new(PT_LOC).as_ptr::<PageTableEntry>(),
                (PT_REGION_LIMIT as usize) / core::mem::size_of::<PageTableEntry>(),
            )
        };

        let handoff = match bootstrap(map, region, PhysAddr::new(PT_LOC)) {
            Ok(h) => h,
            Err(e) => {
                boot_println!("[paging] FATAL: {}", e);
                halt();
            }
        };

        if crate::config::DEBUG_PRINT {
            dump_map(map);
            let counts = handoff.counts();
            boot_println!("[paging] extent {}", handoff.extent);
            boot_println!("[paging] {} pages, {} tables, {} directories, {} KiB of tables",
                counts.pages, counts.tables, counts.directories,
                handoff.tables.layout().total_bytes() / 1024);
            // The top byte must map to itself, or the switch will fault.
            if let Some(top) = handoff.extent.bytes().checked_sub(1) {
                boot_println!("[paging] self-check {:#x} -> {:?}", top, handoff.tables.translate(top));
            }
        }

        unsafe { core::ptr::addr_of_mut!(pml4_ptr32).write_volatile(handoff.cr3()); }
        boot_println!("[paging] PML4 at {:#x}", handoff.cr3());
    }
}
