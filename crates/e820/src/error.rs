use core::{error::Error as _, fmt, panic::Location};

use crate::{Region, Strategy};

/// The kinds of errors that can occur when editing an E820 table.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[non_exhaustive]
pub enum E820ErrorKind {
    #[display("invalid region bounds: base={base:#x}, end={end:#x}")]
    InvalidBounds { base: u64, end: u64 },
    #[display("address range overflows: address={address:#x}, length={length:#x}")]
    AddressOverflow { address: u64, length: u64 },
    #[display("usable memory cannot be allocated from usable memory")]
    UsableAllocation,
    #[display(
        "usable memory overlaps existing region: base={base:#x}, end={end:#x}, existing={existing}"
    )]
    Overlap {
        base: u64,
        end: u64,
        existing: Region,
    },
    #[display("region is not inside a single usable region: base={base:#x}, end={end:#x}")]
    InvalidRegion { base: u64, end: u64 },
    #[display("invalid alignment: address={address:#x}, alignment={alignment:#x}")]
    InvalidAlignment { address: u64, alignment: u64 },
    #[display(
        "no suitable address found: length={length:#x}, alignment={alignment:#x}, \
         strategy={strategy:?}"
    )]
    AllocationFailed {
        length: u64,
        alignment: u64,
        strategy: Strategy,
    },
    #[display("E820 table is full: capacity={capacity}")]
    TableFull { capacity: usize },
}

/// The error type returned by E820 table operations.
///
/// Records where the error was raised along with its kind.
#[derive(Debug)]
pub struct E820Error {
    kind: E820ErrorKind,
    location: &'static Location<'static>,
}

impl E820Error {
    #[track_caller]
    #[must_use]
    pub fn new(kind: E820ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &E820ErrorKind {
        &self.kind
    }

    /// Returns the source location that raised this error.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for E820Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl From<E820ErrorKind> for E820Error {
    #[track_caller]
    fn from(kind: E820ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl core::error::Error for E820Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.kind.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_records_caller() {
        let err = E820Error::from(E820ErrorKind::TableFull { capacity: 4 });
        assert_eq!(err.location().file(), file!());
        assert_eq!(err.to_string(), "E820 table is full: capacity=4");
        assert!(matches!(err.kind(), E820ErrorKind::TableFull { capacity: 4 }));
    }
}
