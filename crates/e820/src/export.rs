//! Serialization of the table for the firmware configuration interface.
//!
//! The guest firmware reads the map as a file named [`FWCFG_FILE_NAME`]
//! holding an array of packed 20-byte little-endian records:
//!
//! ```text
//! offset  size  field
//!      0     8  base
//!      8     8  length
//!     16     4  type
//! ```

use alloc::vec::Vec;
use core::fmt;

use dataview::{DataView, Pod};
use endian::Le;
use platform_cast::CastFrom as _;

use crate::{E820Table, MemoryKind, Region};

/// Name of the firmware configuration file carrying the map.
pub const FWCFG_FILE_NAME: &str = "etc/e820";

/// One record of the exported map.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod)]
pub struct E820Entry {
    base: Le<u64>,
    length: Le<u64>,
    kind: Le<u32>,
}

const _: () = assert!(size_of::<E820Entry>() == 20);
const _: () = assert!(align_of::<E820Entry>() == 1);

impl E820Entry {
    #[must_use]
    pub fn new(base: u64, length: u64, kind: MemoryKind) -> Self {
        Self {
            base: Le::new(base),
            length: Le::new(length),
            kind: Le::new(kind.code()),
        }
    }

    #[must_use]
    pub fn base(&self) -> u64 {
        self.base.read()
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        self.length.read()
    }

    /// Returns the raw E820 type code.
    #[must_use]
    pub fn type_code(&self) -> u32 {
        self.kind.read()
    }

    /// Returns the memory kind, or `None` for an unknown type code.
    #[must_use]
    pub fn kind(&self) -> Option<MemoryKind> {
        MemoryKind::from_code(self.type_code())
    }
}

impl From<&Region> for E820Entry {
    fn from(region: &Region) -> Self {
        Self::new(region.base(), region.len(), region.kind())
    }
}

impl fmt::Display for E820Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {:16x}, {:16x}] ", self.base(), self.length())?;
        match self.kind() {
            Some(kind) => write!(f, "{kind}"),
            None => write!(f, "Unknown ({})", self.type_code()),
        }
    }
}

/// The kinds of errors that can occur when decoding an exported map.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[display("map length is not a multiple of {}: len={len}", size_of::<E820Entry>())]
    TruncatedEntry { len: usize },
    #[display("unknown memory type in entry #{index}: type={code}")]
    UnknownType { index: usize, code: u32 },
}

/// The exported records of a table, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<E820Entry>,
}

impl Snapshot {
    #[must_use]
    pub fn entries(&self) -> &[E820Entry] {
        &self.entries
    }

    /// Returns the records as the bytes handed to the firmware.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        dataview::bytes(self.entries.as_slice())
    }

    /// Returns the size of the exported map in bytes.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        u64::cast_from(self.as_bytes().len())
    }

    /// Parses an exported map.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let entry_size = size_of::<E820Entry>();
        if !bytes.len().is_multiple_of(entry_size) {
            return Err(DecodeError::TruncatedEntry { len: bytes.len() });
        }
        let view = DataView::from(bytes);
        let entries = view.slice::<E820Entry>(0, bytes.len() / entry_size);
        if let Some((index, entry)) = entries.iter().enumerate().find(|(_, e)| e.kind().is_none()) {
            return Err(DecodeError::UnknownType {
                index,
                code: entry.type_code(),
            });
        }
        Ok(Self {
            entries: entries.to_vec(),
        })
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a E820Entry;
    type IntoIter = core::slice::Iter<'a, E820Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A named file for the firmware configuration interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FwCfgItem {
    pub name: &'static str,
    pub data: Vec<u8>,
}

impl<const CAP: usize> E820Table<CAP> {
    /// Exports the table, one record per region.
    ///
    /// Returns `None` if the table has no regions, which means it was never
    /// initialized.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        if self.is_empty() {
            return None;
        }
        let entries = self.iter().map(E820Entry::from).collect();
        Some(Snapshot { entries })
    }

    /// Exports the table as the firmware configuration file
    /// [`FWCFG_FILE_NAME`].
    #[must_use]
    pub fn fwcfg_item(&self) -> Option<FwCfgItem> {
        let Some(snapshot) = self.snapshot() else {
            log::warn!("e820: table is empty");
            return None;
        };
        Some(FwCfgItem {
            name: FWCFG_FILE_NAME,
            data: snapshot.as_bytes().to_vec(),
        })
    }
}
