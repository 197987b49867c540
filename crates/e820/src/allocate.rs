//! Placement of typed windows inside usable memory.

use crate::{E820Error, E820ErrorKind, E820Table, MemoryKind, layout::HIGHMEM_BASE};

/// Alignment that places no constraint on the address.
pub const ALIGNMENT_NONE: u64 = 1;

/// Policy for choosing where a new region is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The lowest suitable address anywhere in the table.
    Any,
    /// The lowest suitable address at or above the given address.
    Lowest(u64),
    /// The highest suitable address whose window ends at or below the given
    /// address.
    Highest(u64),
    /// Exactly the given address.
    Specific(u64),
}

fn align_up(addr: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment.is_power_of_two());
    Some(addr.checked_add(alignment - 1)? & !(alignment - 1))
}

fn align_down(addr: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    addr & !(alignment - 1)
}

impl<const CAP: usize> E820Table<CAP> {
    /// Reserves a `length`-byte window of type `kind` and returns its address.
    ///
    /// `alignment` must be a power of two. For [`Strategy::Lowest`] and
    /// [`Strategy::Specific`] the given address must already be aligned.
    ///
    /// Address `0` is never returned: a placement that would start at `0` is
    /// treated as not fitting. The table is left unchanged on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use e820::{E820Table, MemoryKind, Strategy};
    ///
    /// let mut table = E820Table::<16>::new();
    /// table.insert_region(0x1000, 0x10_0000, MemoryKind::Usable).unwrap();
    ///
    /// let addr = table
    ///     .allocate(0x1000, 0x1000, MemoryKind::Reserved, Strategy::Any)
    ///     .unwrap();
    /// assert_eq!(addr, 0x1000);
    ///
    /// let addr = table
    ///     .allocate(0x1000, 0x1000, MemoryKind::Reserved, Strategy::Highest(u64::MAX))
    ///     .unwrap();
    /// assert_eq!(addr, 0xf_f000);
    /// ```
    pub fn allocate(
        &mut self,
        length: u64,
        alignment: u64,
        kind: MemoryKind,
        strategy: Strategy,
    ) -> Result<u64, E820Error> {
        let address = match strategy {
            Strategy::Any => 0,
            Strategy::Lowest(address)
            | Strategy::Highest(address)
            | Strategy::Specific(address) => address,
        };
        ensure!(
            alignment.is_power_of_two(),
            E820ErrorKind::InvalidAlignment { address, alignment }
        );
        if matches!(strategy, Strategy::Lowest(_) | Strategy::Specific(_)) {
            ensure!(
                address.is_multiple_of(alignment),
                E820ErrorKind::InvalidAlignment { address, alignment }
            );
        }
        ensure!(!kind.is_usable(), E820ErrorKind::UsableAllocation);

        let failed = || E820ErrorKind::AllocationFailed {
            length,
            alignment,
            strategy,
        };

        let address = match strategy {
            Strategy::Any => self.find_lowest(0, length, alignment),
            Strategy::Lowest(min_address) => self.find_lowest(min_address, length, alignment),
            Strategy::Highest(max_address) => self.find_highest(max_address, length, alignment),
            Strategy::Specific(address) => (address != 0).then_some(address),
        }
        .ok_or_else(failed)?;
        let end = address
            .checked_add(length)
            .ok_or(E820ErrorKind::AddressOverflow { address, length })?;

        match self.insert_region(address, end, kind) {
            Ok(()) => Ok(address),
            Err(err) if matches!(err.kind(), E820ErrorKind::TableFull { .. }) => Err(err),
            Err(err) => {
                log::debug!("e820: cannot place {kind} at {address:#x}: {err}");
                Err(failed().into())
            }
        }
    }

    /// Returns the lowest aligned address at or above `min_address` where
    /// `length` bytes fit inside a usable region.
    fn find_lowest(&self, min_address: u64, length: u64, alignment: u64) -> Option<u64> {
        self.iter()
            .filter(|region| region.kind().is_usable())
            .find_map(|region| {
                let base = u64::max(min_address, align_up(region.base(), alignment)?);
                let fits = base != 0 && region.end() >= base && region.end() - base >= length;
                fits.then_some(base)
            })
    }

    /// Returns the highest aligned address where `length` bytes fit inside a
    /// usable region without ending above `max_address`.
    fn find_highest(&self, max_address: u64, length: u64, alignment: u64) -> Option<u64> {
        self.iter()
            .rev()
            .filter(|region| region.kind().is_usable())
            .find_map(|region| {
                let end = u64::min(max_address, region.end());
                let base = align_up(region.base(), alignment)?;
                if end < base || end - base < length || end - length == 0 {
                    return None;
                }
                let address = align_down(end - length, alignment);
                (address != 0).then_some(address)
            })
    }

    /// Places an MMIO window for a passed-through device.
    ///
    /// The host address is tried first, so the guest sees the device at the
    /// same address as the host. If that range is not available, the window
    /// is placed as high as possible below 4 GiB.
    pub fn allocate_mmio(
        &mut self,
        host_address: u64,
        length: u64,
        alignment: u64,
        kind: MemoryKind,
    ) -> Result<u64, E820Error> {
        match self.allocate(length, ALIGNMENT_NONE, kind, Strategy::Specific(host_address)) {
            Ok(address) => return Ok(address),
            Err(err) => {
                log::debug!("e820: host address {host_address:#x} unavailable: {err}");
            }
        }

        let address = self
            .allocate(length, alignment, kind, Strategy::Highest(HIGHMEM_BASE))
            .inspect_err(|_| {
                log::warn!("e820: no room for {kind} window of {length:#x} bytes\n{self}");
            })?;
        log::warn!(
            "e820: host address {host_address:#x} unavailable, {kind} window at {address:#x}"
        );
        Ok(address)
    }
}
