use core::{fmt, ops::Range};

/// The type of a guest physical address range, using the E820 type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::IsVariant)]
#[repr(u32)]
pub enum MemoryKind {
    /// General purpose guest memory.
    Usable = 1,
    /// Reserved for devices or firmware.
    Reserved = 2,
    /// ACPI tables, reclaimable by the guest once they have been read.
    Acpi = 3,
    /// ACPI non-volatile storage.
    Nvs = 4,
}

impl MemoryKind {
    /// Returns the E820 type code.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Looks up the kind for an E820 type code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            1 => Self::Usable,
            2 => Self::Reserved,
            3 => Self::Acpi,
            4 => Self::Nvs,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the short name used in table dumps.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Usable => "RAM",
            Self::Reserved => "Reserved",
            Self::Acpi => "ACPI",
            Self::Nvs => "NVS",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A typed, half-open guest physical address interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub(crate) base: u64,
    pub(crate) end: u64,
    pub(crate) kind: MemoryKind,
}

impl Region {
    /// Creates a region covering `base..end`.
    ///
    /// # Panics
    ///
    /// Panics if `end < base`.
    #[must_use]
    pub fn new(base: u64, end: u64, kind: MemoryKind) -> Self {
        assert!(base <= end, "Invalid region: {base:#x}..{end:#x}");
        Self { base, end, kind }
    }

    /// Returns the first address of the region.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns the address one past the last address of the region.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.base
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base == self.end
    }

    #[must_use]
    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    #[must_use]
    pub fn range(&self) -> Range<u64> {
        self.base..self.end
    }

    /// Returns `true` if `base..end` lies entirely inside this region.
    #[must_use]
    pub fn contains(&self, base: u64, end: u64) -> bool {
        self.base <= base && end <= self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x}) {}", self.base, self.end, self.kind)
    }
}
