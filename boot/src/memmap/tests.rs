/// Unit tests for the E820 normalizer: ordering, extent, filtering.
///
/// Pure in-memory logic. Run with: cargo test --target x86_64-unknown-linux-gnu --lib
use alloc::vec::Vec;

use super::*;

fn region(base: u64, length: u64) -> MemoryRegion {
    MemoryRegion::new(base, length, RegionKind::USABLE)
}

/// The map a small QEMU guest reports, out of order.
fn qemu_like_map() -> MemoryMap {
    MemoryMap::from_regions(&[
        region(0x100000, 0x7EE0000),
        region(0x0, 0x9FC00),
        region(0x1_0000_0000, 0x1000_0000),
    ])
    .unwrap()
}

/// Tiny xorshift so the shuffled-map tests are deterministic.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn random_map(rng: &mut XorShift, count: usize) -> MemoryMap {
    let mut regions = Vec::new();
    for i in 0..count {
        // Few distinct bases so equal keys show up often.
        let base = (rng.next() % 8) * 0x10_0000;
        let length = rng.next() % 0x100_0000;
        let kind = RegionKind((rng.next() % 5) as u32 + 1);
        regions.push(MemoryRegion { base, length, kind, acpi: i as u32 });
    }
    MemoryMap::from_regions(&regions).unwrap()
}

// ---- sort ----

#[test]
fn sort_orders_by_base() {
    let mut map = qemu_like_map();
    map.sort();

    let bases: Vec<u64> = map.entries().iter().map(|e| e.base).collect();
    assert_eq!(bases, [0x0, 0x100000, 0x1_0000_0000]);
    assert_eq!(map.len(), 3);
}

#[test]
fn sort_keeps_equal_bases_in_order() {
    let mut map = MemoryMap::from_regions(&[
        MemoryRegion { base: 0x2000, length: 1, kind: RegionKind::USABLE, acpi: 0 },
        MemoryRegion { base: 0x1000, length: 2, kind: RegionKind::RESERVED, acpi: 1 },
        MemoryRegion { base: 0x2000, length: 3, kind: RegionKind::ACPI_NVS, acpi: 2 },
        MemoryRegion { base: 0x1000, length: 4, kind: RegionKind::USABLE, acpi: 3 },
    ])
    .unwrap();
    map.sort();

    let tags: Vec<u32> = map.entries().iter().map(|e| e.acpi).collect();
    assert_eq!(tags, [1, 3, 0, 2]);
}

#[test]
fn sort_matches_stable_reference() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    for count in [0, 1, 2, 3, 7, 16, 33, MAX_REGIONS] {
        let mut map = random_map(&mut rng, count);
        let mut expected: Vec<MemoryRegion> = map.entries().to_vec();
        expected.sort_by_key(|e| e.base);

        map.sort();

        // Same multiset, same stable order.
        assert_eq!(map.entries(), expected.as_slice(), "count={}", count);
        for pair in map.entries().windows(2) {
            assert!(pair[0].base <= pair[1].base);
        }
    }
}

#[test]
fn sort_already_sorted_is_unchanged() {
    let mut map = MemoryMap::from_regions(&[region(0, 1), region(1, 1), region(2, 1)]).unwrap();
    let before: Vec<MemoryRegion> = map.entries().to_vec();
    map.sort();
    assert_eq!(map.entries(), before.as_slice());
}

#[test]
fn sort_ignores_slots_past_size() {
    let mut map = MemoryMap::from_regions(&[region(0x3000, 1), region(0x1000, 1)]).unwrap();
    map.entries[2] = region(0x0, 1); // stale slot
    map.sort();

    assert_eq!(map.entries()[0].base, 0x1000);
    assert_eq!(map.entries[2].base, 0x0);
}

#[test]
fn sort_empty_map() {
    let mut map = MemoryMap::new();
    map.sort();
    assert!(map.is_empty());
}

// ---- extent ----

#[test]
fn extent_of_qemu_map() {
    let map = qemu_like_map();
    assert_eq!(map.ram_extent(), RamExtent(0x1_1000_0000));
}

#[test]
fn extent_independent_of_order() {
    let mut rng = XorShift(42);
    for _ in 0..32 {
        let mut map = random_map(&mut rng, 12);
        let expected = map.entries().iter().map(|e| e.base + e.length).max().unwrap();
        assert_eq!(map.ram_extent().bytes(), expected);

        map.entries_mut().reverse();
        assert_eq!(map.ram_extent().bytes(), expected);

        map.sort();
        assert_eq!(map.ram_extent().bytes(), expected);
    }
}

#[test]
fn extent_counts_reserved_regions() {
    let map = MemoryMap::from_regions(&[
        region(0, 0x9FC00),
        MemoryRegion::new(0xFEC0_0000, 0x1000, RegionKind::RESERVED),
    ])
    .unwrap();
    assert_eq!(map.ram_extent().bytes(), 0xFEC0_1000);
}

#[test]
fn extent_of_empty_map_is_zero() {
    assert_eq!(MemoryMap::new().ram_extent(), RamExtent(0));
}

// ---- validation ----

#[test]
fn oversized_count_rejected() {
    let mut map = MemoryMap::new();
    map.size = MAX_REGIONS as u32 + 1;

    assert_eq!(map.validate(), Err(BootError::MapTooLarge { size: MAX_REGIONS as u32 + 1 }));
    assert_eq!(normalize(&mut map), Err(BootError::MapTooLarge { size: MAX_REGIONS as u32 + 1 }));
    // Accessors still stay inside the buffer.
    assert_eq!(map.len(), MAX_REGIONS);
}

#[test]
fn from_regions_rejects_overflow() {
    let regions = [MemoryRegion::EMPTY; MAX_REGIONS + 1];
    assert!(MemoryMap::from_regions(&regions).is_err());
    assert!(MemoryMap::from_regions(&regions[..MAX_REGIONS]).is_ok());
}

// ---- filtering ----

#[test]
fn retain_usable_keeps_order() {
    let mut map = MemoryMap::from_regions(&[
        region(0x100000, 0x1000),
        MemoryRegion::new(0xF0000, 0x10000, RegionKind::RESERVED),
        region(0x0, 0x9FC00),
        MemoryRegion::new(0x9FC00, 0x400, RegionKind::ACPI_RECLAIMABLE),
    ])
    .unwrap();
    map.retain_usable();

    let bases: Vec<u64> = map.entries().iter().map(|e| e.base).collect();
    assert_eq!(bases, [0x100000, 0x0]);
    assert_eq!(map.reported_size(), 2);
    assert_eq!(map.entries[2], MemoryRegion::EMPTY);
}

#[test]
fn usable_bytes_skips_reserved() {
    let map = MemoryMap::from_regions(&[
        region(0x0, 0x9FC00),
        MemoryRegion::new(0xF0000, 0x10000, RegionKind::RESERVED),
        region(0x100000, 0x7EE0000),
    ])
    .unwrap();
    assert_eq!(map.usable_bytes(), 0x9FC00 + 0x7EE0000);
}

#[test]
#[cfg(not(feature = "usable-only"))]
fn normalize_sorts_without_filtering() {
    let mut map = qemu_like_map();
    map.entries_mut()[2].kind = RegionKind::RESERVED;

    let extent = normalize(&mut map).unwrap();

    assert_eq!(extent, RamExtent(0x1_1000_0000));
    assert_eq!(map.len(), 3);
    assert_eq!(map.entries()[2].kind, RegionKind::RESERVED);
}

#[test]
#[cfg(feature = "usable-only")]
fn normalize_drops_unusable() {
    let mut map = qemu_like_map();
    map.entries_mut()[2].kind = RegionKind::RESERVED;

    let extent = normalize(&mut map).unwrap();

    assert_eq!(extent, RamExtent(0x7FE_0000));
    assert_eq!(map.len(), 2);
}

#[test]
fn kind_names() {
    assert_eq!(RegionKind::USABLE.name(), "usable");
    assert_eq!(RegionKind::ACPI_NVS.name(), "ACPI NVS");
    assert_eq!(RegionKind(0x1234).name(), "unknown");
}
