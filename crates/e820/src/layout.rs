//! Initial guest memory layout.

use core::ops::Range;

use crate::{E820Error, E820ErrorKind, E820Table, MemoryKind};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Start of the memory that is mapped above the 32-bit PCI hole.
pub const HIGHMEM_BASE: u64 = 4 * GIB;

/// Legacy VGA frame buffer window.
pub const VGA_HOLE: Range<u64> = 0xa_0000..0xc_0000;
/// Legacy option ROM and BIOS window.
pub const ROM_HOLE: Range<u64> = 0xc_0000..0x10_0000;

/// Guest memory sizes the table is initialized from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Bytes of memory starting at address `0`.
    pub lowmem_size: u64,
    /// Bytes of memory starting at [`HIGHMEM_BASE`], or `0` for none.
    pub highmem_size: u64,
}

impl MemoryConfig {
    #[must_use]
    pub fn new(lowmem_size: u64, highmem_size: u64) -> Self {
        Self {
            lowmem_size,
            highmem_size,
        }
    }

    /// Returns the guest physical range of low memory.
    #[must_use]
    pub fn lowmem_range(&self) -> Range<u64> {
        0..self.lowmem_size
    }

    /// Returns the guest physical range of high memory, if any.
    ///
    /// Fails if high memory would extend past the end of the address space.
    pub fn highmem_range(&self) -> Result<Option<Range<u64>>, E820Error> {
        if self.highmem_size == 0 {
            return Ok(None);
        }
        let end = HIGHMEM_BASE
            .checked_add(self.highmem_size)
            .ok_or(E820ErrorKind::AddressOverflow {
                address: HIGHMEM_BASE,
                length: self.highmem_size,
            })?;
        Ok(Some(HIGHMEM_BASE..end))
    }
}

impl<const CAP: usize> E820Table<CAP> {
    /// Builds the initial table for a guest with the given memory sizes.
    ///
    /// Low memory and, if present, high memory are added as usable memory,
    /// then the legacy VGA and ROM windows are removed from it.
    ///
    /// # Examples
    ///
    /// ```
    /// use e820::{E820Table, MemoryConfig, MemoryKind, Region};
    ///
    /// let table = E820Table::<16>::with_memory(&MemoryConfig::new(0x2000_0000, 0)).unwrap();
    /// assert_eq!(
    ///     table.as_slice(),
    ///     &[
    ///         Region::new(0x0, 0xa_0000, MemoryKind::Usable),
    ///         Region::new(0x10_0000, 0x2000_0000, MemoryKind::Usable),
    ///     ]
    /// );
    /// ```
    pub fn with_memory(config: &MemoryConfig) -> Result<Self, E820Error> {
        let mut table = Self::new();

        let lowmem = config.lowmem_range();
        table
            .insert_region(lowmem.start, lowmem.end, MemoryKind::Usable)
            .inspect_err(|err| log::warn!("e820: could not add lowmem: {err}"))?;

        let highmem = config
            .highmem_range()
            .inspect_err(|err| log::warn!("e820: could not add highmem: {err}"))?;
        if let Some(highmem) = highmem {
            table
                .insert_region(highmem.start, highmem.end, MemoryKind::Usable)
                .inspect_err(|err| log::warn!("e820: could not add highmem: {err}"))?;
        }

        table
            .carve_hole(VGA_HOLE.start, VGA_HOLE.end)
            .inspect_err(|err| log::warn!("e820: could not add VGA memory hole: {err}"))?;
        table
            .carve_hole(ROM_HOLE.start, ROM_HOLE.end)
            .inspect_err(|err| log::warn!("e820: could not add ROM memory hole: {err}"))?;

        Ok(table)
    }
}
