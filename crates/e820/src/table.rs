//! The ordered region list backing an E820 map.
//!
//! The table keeps its regions sorted by base address and never lets two of
//! them overlap. Usable memory is added first; every other region type is
//! carved out of a single existing usable region, which is shrunk or split
//! around it.

use core::{fmt, slice};

use arrayvec::ArrayVec;

use crate::{E820Error, E820ErrorKind, MemoryKind, Region};

/// Default number of regions a [`E820Table`] can hold.
pub const DEFAULT_CAPACITY: usize = 128;

/// Where a sub-range sits inside the usable region that contains it.
///
/// A range that covers the whole usable region is classified as
/// [`Boundary::AtBase`], which leaves an empty usable region at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Boundary {
    /// The range starts at the base of the usable region.
    AtBase,
    /// The range ends at the end of the usable region.
    AtEnd,
    /// The range lies strictly inside the usable region.
    Interior,
}

impl Boundary {
    /// Classifies `base..end` against `region`.
    ///
    /// The checks run in a fixed order: base boundary first, then end
    /// boundary.
    #[must_use]
    pub fn classify(region: &Region, base: u64, end: u64) -> Self {
        if base == region.base {
            Self::AtBase
        } else if end == region.end {
            Self::AtEnd
        } else {
            Self::Interior
        }
    }
}

/// An ordered, non-overlapping set of typed guest physical address regions.
///
/// `E820Table` holds at most `CAP` regions in an inline vector. Regions are
/// sorted by base address and never overlap; gaps between them describe
/// address space that is absent from the map.
///
/// The table does no locking. It is `Send`, so it can be handed to another
/// thread, but concurrent device setup must serialize access externally.
///
/// # Examples
///
/// ```
/// use e820::{E820Table, MemoryKind, Region};
///
/// let mut table = E820Table::<16>::new();
/// table.insert_region(0x0, 0x10_0000, MemoryKind::Usable).unwrap();
/// table.insert_region(0x8_0000, 0x9_0000, MemoryKind::Reserved).unwrap();
/// table.carve_hole(0xa_0000, 0xc_0000).unwrap();
///
/// assert_eq!(
///     table.as_slice(),
///     &[
///         Region::new(0x0, 0x8_0000, MemoryKind::Usable),
///         Region::new(0x8_0000, 0x9_0000, MemoryKind::Reserved),
///         Region::new(0x9_0000, 0xa_0000, MemoryKind::Usable),
///         Region::new(0xc_0000, 0x10_0000, MemoryKind::Usable),
///     ]
/// );
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct E820Table<const CAP: usize = DEFAULT_CAPACITY> {
    regions: ArrayVec<Region, CAP>,
}

impl<const CAP: usize> E820Table<CAP> {
    /// Creates a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the regions in ascending address order.
    pub fn iter(&self) -> slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Returns the regions in ascending address order.
    #[must_use]
    pub fn as_slice(&self) -> &[Region] {
        self.regions.as_slice()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns the number of regions the table can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.regions.capacity()
    }

    /// Returns the index of the first region that ends after `base`.
    ///
    /// Since the regions are sorted and disjoint, every region before the
    /// returned index lies entirely below `base`.
    fn find_first_ending_after(&self, base: u64) -> Option<usize> {
        self.regions.iter().position(|r| r.end > base)
    }

    fn ensure_capacity(&self, additional: usize) -> Result<(), E820Error> {
        ensure!(
            self.regions.remaining_capacity() >= additional,
            E820ErrorKind::TableFull {
                capacity: self.regions.capacity(),
            }
        );
        Ok(())
    }

    /// Adds the region `base..end` of type `kind` to the table.
    ///
    /// Usable memory must not overlap any existing region. Any other type
    /// must lie inside a single usable region, which is shrunk or split
    /// around the new region (see [`Boundary`]).
    ///
    /// Alignment is not checked here. The table is left unchanged on error.
    pub fn insert_region(
        &mut self,
        base: u64,
        end: u64,
        kind: MemoryKind,
    ) -> Result<(), E820Error> {
        ensure!(end >= base, E820ErrorKind::InvalidBounds { base, end });

        let new_region = Region { base, end, kind };
        let found = self.find_first_ending_after(base);

        if kind.is_usable() {
            self.ensure_capacity(1)?;
            let Some(index) = found else {
                // above every existing region
                self.regions.push(new_region);
                log::debug!("e820: added {new_region}");
                return Ok(());
            };
            let existing = self.regions[index];
            ensure!(
                end <= existing.base,
                E820ErrorKind::Overlap {
                    base,
                    end,
                    existing,
                }
            );
            self.regions.insert(index, new_region);
            log::debug!("e820: added {new_region}");
            return Ok(());
        }

        let Some(index) = found else {
            bail!(E820ErrorKind::InvalidRegion { base, end });
        };
        let usable = self.regions[index];
        ensure!(
            usable.kind.is_usable() && usable.contains(base, end),
            E820ErrorKind::InvalidRegion { base, end }
        );

        match Boundary::classify(&usable, base, end) {
            Boundary::AtBase => {
                self.ensure_capacity(1)?;
                self.regions.insert(index, new_region);
                self.regions[index + 1].base = end;
            }
            Boundary::AtEnd => {
                self.ensure_capacity(1)?;
                self.regions[index].end = base;
                self.regions.insert(index + 1, new_region);
            }
            Boundary::Interior => {
                self.ensure_capacity(2)?;
                let left = Region {
                    base: usable.base,
                    end: base,
                    kind: MemoryKind::Usable,
                };
                self.regions[index].base = end;
                self.regions.insert(index, new_region);
                self.regions.insert(index, left);
            }
        }
        log::debug!("e820: added {new_region} inside {usable}");

        Ok(())
    }

    /// Removes `base..end` from the usable memory of the table.
    ///
    /// A hole that does not touch any region succeeds without changing the
    /// table, so carving the same hole twice is the same as carving it once.
    /// Otherwise the hole must lie inside a single usable region, which is
    /// shrunk or split; no record of the hole itself remains.
    ///
    /// The table is left unchanged on error.
    pub fn carve_hole(&mut self, base: u64, end: u64) -> Result<(), E820Error> {
        ensure!(end >= base, E820ErrorKind::InvalidBounds { base, end });

        let Some(index) = self.find_first_ending_after(base) else {
            return Ok(());
        };
        let usable = self.regions[index];
        if end <= usable.base {
            return Ok(());
        }
        ensure!(
            usable.kind.is_usable() && usable.contains(base, end),
            E820ErrorKind::InvalidRegion { base, end }
        );

        match Boundary::classify(&usable, base, end) {
            Boundary::AtBase => self.regions[index].base = end,
            Boundary::AtEnd => self.regions[index].end = base,
            Boundary::Interior => {
                self.ensure_capacity(1)?;
                let left = Region {
                    base: usable.base,
                    end: base,
                    kind: MemoryKind::Usable,
                };
                self.regions[index].base = end;
                self.regions.insert(index, left);
            }
        }
        log::debug!("e820: carved hole [{base:#x}, {end:#x}) from {usable}");

        Ok(())
    }

    /// Returns the regions as-is, for diagnostics.
    ///
    /// This is the same as [`iter`](Self::iter); the table is not modified
    /// and the dump can be taken any number of times.
    pub fn dump(&self) -> impl ExactSizeIterator<Item = Region> + '_ {
        self.regions.iter().copied()
    }
}

impl<const CAP: usize> fmt::Display for E820Table<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "E820 map:")?;
        for (i, region) in self.regions.iter().enumerate() {
            writeln!(
                f,
                "  ({i:4}) [ {:16x}, {:16x}] {:<8}",
                region.base, region.end, region.kind
            )?;
        }
        Ok(())
    }
}

impl<'a, const CAP: usize> IntoIterator for &'a E820Table<CAP> {
    type Item = &'a Region;
    type IntoIter = slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
