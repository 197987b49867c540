#![cfg(test)]

use e820::{
    E820ErrorKind, E820Table, MemoryConfig, MemoryKind, Region, Strategy,
    layout::{GIB, MIB, ROM_HOLE, VGA_HOLE},
};

const U: MemoryKind = MemoryKind::Usable;
const R: MemoryKind = MemoryKind::Reserved;

fn lowmem_table() -> E820Table<32> {
    E820Table::with_memory(&MemoryConfig::new(0x2000_0000, 0)).unwrap()
}

fn assert_sorted_disjoint(table: &E820Table<32>) {
    for pair in table.as_slice().windows(2) {
        assert!(pair[0].base() <= pair[0].end(), "inverted: {}", pair[0]);
        assert!(
            pair[0].end() <= pair[1].base(),
            "overlap: {} {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn init_then_fixed_holes() {
    let mut table = E820Table::<32>::new();
    table.insert_region(0, 0x2000_0000, U).unwrap();
    assert_eq!(table.as_slice(), &[Region::new(0, 0x2000_0000, U)]);

    table.carve_hole(VGA_HOLE.start, VGA_HOLE.end).unwrap();
    table.carve_hole(ROM_HOLE.start, ROM_HOLE.end).unwrap();
    assert_eq!(
        table.as_slice(),
        &[
            Region::new(0, 0xa_0000, U),
            Region::new(0x10_0000, 0x2000_0000, U),
        ]
    );
    assert_eq!(table, lowmem_table());
}

#[test]
fn specific_at_start_of_memory_above_1mib() {
    let mut table = lowmem_table();
    let addr = table
        .allocate(0x1000, 0x1000, R, Strategy::Specific(0x10_0000))
        .unwrap();
    assert_eq!(addr, 0x10_0000);
    assert_eq!(
        table.as_slice(),
        &[
            Region::new(0, 0xa_0000, U),
            Region::new(0x10_0000, 0x10_1000, R),
            Region::new(0x10_1000, 0x2000_0000, U),
        ]
    );
}

#[test]
fn highest_in_high_memory() {
    let high_end = 4 * GIB + 256 * MIB;
    let mut table = E820Table::<32>::new();
    table.insert_region(4 * GIB, high_end, U).unwrap();

    let addr = table
        .allocate(0x2000, 0x10_0000, R, Strategy::Highest(u64::MAX))
        .unwrap();
    assert!(addr.is_multiple_of(0x10_0000));
    assert!(addr + 0x2000 <= high_end);
    assert!(addr + 0x10_0000 + 0x2000 > high_end, "not the highest: {addr:#x}");

    // a window may not end above the limit
    let mut table = E820Table::<32>::new();
    table.insert_region(4 * GIB, high_end, U).unwrap();
    let err = table
        .allocate(0x2000, 0x10_0000, R, Strategy::Highest(4 * GIB))
        .unwrap_err();
    assert!(matches!(err.kind(), E820ErrorKind::AllocationFailed { .. }));
}

#[test]
fn specific_zero_always_fails() {
    for (length, alignment) in [(0x1000, 0x1000), (0x1, 0x1), (0x0, 0x10_0000)] {
        let mut table = lowmem_table();
        let err = table
            .allocate(length, alignment, R, Strategy::Specific(0))
            .unwrap_err();
        assert!(matches!(err.kind(), E820ErrorKind::AllocationFailed { .. }));
        assert_eq!(table, lowmem_table());
    }
}

#[test]
fn usable_overlapping_reserved_is_rejected() {
    let mut table = lowmem_table();
    table
        .allocate(0x1000, 0x1000, R, Strategy::Specific(0x20_0000))
        .unwrap();
    let before = table.clone();
    let err = table
        .insert_region(0x20_0000, 0x20_0800, U)
        .unwrap_err();
    assert!(matches!(err.kind(), E820ErrorKind::Overlap { .. }));
    assert_eq!(table, before);
}

#[test]
fn allocations_appear_in_dump() {
    let mut table = E820Table::<32>::with_memory(&MemoryConfig::new(3 * GIB, GIB)).unwrap();
    let requests = [
        (0x1000, 0x1000, MemoryKind::Acpi, Strategy::Any),
        (0x4000, 0x1000, MemoryKind::Nvs, Strategy::Lowest(0x20_0000)),
        (0x10_0000, 0x10_0000, R, Strategy::Highest(4 * GIB)),
        (0x1_0000, 0x1_0000, R, Strategy::Highest(u64::MAX)),
        (0x5000, 0x1000, R, Strategy::Specific(0x8000_0000)),
    ];
    for (length, alignment, kind, strategy) in requests {
        let addr = table.allocate(length, alignment, kind, strategy).unwrap();
        assert_ne!(addr, 0);
        assert!(addr.is_multiple_of(alignment));
        assert!(
            table
                .dump()
                .any(|r| r == Region::new(addr, addr + length, kind)),
            "missing {kind} at {addr:#x}\n{table}"
        );
        assert_sorted_disjoint(&table);
    }
}

#[test]
fn repeated_holes_are_idempotent() {
    let mut table = lowmem_table();
    let once = table.clone();
    table.carve_hole(VGA_HOLE.start, VGA_HOLE.end).unwrap();
    table.carve_hole(ROM_HOLE.start, ROM_HOLE.end).unwrap();
    assert_eq!(table, once);
}

#[test]
fn exported_map_matches_table() {
    let mut table = lowmem_table();
    table
        .allocate(0x1000, 0x1000, R, Strategy::Highest(u64::MAX))
        .unwrap();
    let snapshot = table.snapshot().unwrap();
    assert_eq!(snapshot.byte_len(), 20 * 3);
    for (entry, region) in snapshot.entries().iter().zip(table.dump()) {
        assert_eq!(entry.base(), region.base());
        assert_eq!(entry.length(), region.len());
        assert_eq!(entry.kind(), Some(region.kind()));
    }
}
