//! Reservation of fixed resource windows described by a device.

use core::fmt;

use crate::{E820Error, E820Table, MemoryKind, Strategy, allocate::ALIGNMENT_NONE};

/// A fixed memory window a device decodes, such as an entry of an ACPI
/// `_CRS` resource template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resource {
    pub base: u64,
    pub length: u64,
    pub kind: MemoryKind,
}

impl Resource {
    #[must_use]
    pub fn new(base: u64, length: u64, kind: MemoryKind) -> Self {
        Self { base, length, kind }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} window at {:#x} ({:#x} bytes)",
            self.kind, self.base, self.length
        )
    }
}

/// The error returned when one resource of a batch could not be reserved.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("failed to reserve resource #{index}, {resource}")]
pub struct ReserveResourcesError {
    index: usize,
    resource: Resource,
    source: E820Error,
}

impl ReserveResourcesError {
    /// Returns the position of the failing resource in the batch.
    ///
    /// All resources before it are reserved in the table.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    #[must_use]
    pub fn error(&self) -> &E820Error {
        &self.source
    }
}

impl<const CAP: usize> E820Table<CAP> {
    /// Reserves every resource at its fixed address, in order.
    ///
    /// This is not atomic: when a resource fails, the resources before it
    /// stay reserved and the ones after it are not attempted. A caller that
    /// gets an error should treat the device's reservations as unusable.
    pub fn reserve_all<I>(&mut self, resources: I) -> Result<(), ReserveResourcesError>
    where
        I: IntoIterator<Item = Resource>,
    {
        for (index, resource) in resources.into_iter().enumerate() {
            self.allocate(
                resource.length,
                ALIGNMENT_NONE,
                resource.kind,
                Strategy::Specific(resource.base),
            )
            .map_err(|source| ReserveResourcesError {
                index,
                resource,
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{E820ErrorKind, Region};

    const U: MemoryKind = MemoryKind::Usable;
    const R: MemoryKind = MemoryKind::Reserved;

    #[test]
    fn test_reserve_all() {
        let mut table = E820Table::<16>::new();
        table.insert_region(0x0, 0x1_0000_0000, U).unwrap();
        table
            .reserve_all([
                Resource::new(0xfed4_0000, 0x5000, R),
                Resource::new(0xfec0_0000, 0x1000, R),
            ])
            .unwrap();
        assert_eq!(
            table.as_slice(),
            &[
                Region::new(0x0, 0xfec0_0000, U),
                Region::new(0xfec0_0000, 0xfec0_1000, R),
                Region::new(0xfec0_1000, 0xfed4_0000, U),
                Region::new(0xfed4_0000, 0xfed4_5000, R),
                Region::new(0xfed4_5000, 0x1_0000_0000, U),
            ]
        );
    }

    #[test]
    fn test_reserve_all_partial_failure() {
        let mut table = E820Table::<16>::new();
        table.insert_region(0x0, 0x10_0000, U).unwrap();
        let err = table
            .reserve_all([
                Resource::new(0x1000, 0x1000, R),
                Resource::new(0x20_0000, 0x1000, R),
                Resource::new(0x3000, 0x1000, R),
            ])
            .unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(err.resource().base, 0x20_0000);
        assert!(matches!(
            err.error().kind(),
            E820ErrorKind::AllocationFailed { .. }
        ));
        // the first resource stays reserved, the third was never attempted
        assert_eq!(
            table.as_slice(),
            &[
                Region::new(0x0, 0x1000, U),
                Region::new(0x1000, 0x2000, R),
                Region::new(0x2000, 0x10_0000, U),
            ]
        );
    }

    #[test]
    fn test_reserve_all_empty() {
        let mut table = E820Table::<16>::new();
        table.reserve_all([]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_error_display() {
        let mut table = E820Table::<16>::new();
        let err = table
            .reserve_all([Resource::new(0x1000, 0x10, MemoryKind::Acpi)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to reserve resource #0, ACPI window at 0x1000 (0x10 bytes)"
        );
        assert!(core::error::Error::source(&err).is_some());
    }
}
