//! Guest physical address map for virtual machines.
//!
//! This crate maintains the E820 map of a guest: an ordered set of
//! non-overlapping, typed address ranges describing which parts of the guest
//! physical address space are usable memory and which are reserved for
//! devices, ACPI tables, or firmware.
//!
//! # Overview
//!
//! - [`E820Table`] holds the regions and provides the
//!   [`insert_region`](E820Table::insert_region) and
//!   [`carve_hole`](E820Table::carve_hole) primitives.
//! - [`E820Table::allocate`] places a new typed window inside usable memory
//!   using one of the [`Strategy`] policies.
//! - [`E820Table::snapshot`] exports the table as the packed records read by
//!   guest firmware.
//!
//! # Examples
//!
//! ```
//! use e820::{E820Table, MemoryConfig, MemoryKind, Strategy};
//!
//! // 512 MiB of low memory, no memory above 4 GiB
//! let mut table = E820Table::<32>::with_memory(&MemoryConfig::new(0x2000_0000, 0)).unwrap();
//!
//! // reserve an MMIO window for a device
//! let addr = table
//!     .allocate(0x1000, 0x1000, MemoryKind::Reserved, Strategy::Specific(0x10_0000))
//!     .unwrap();
//! assert_eq!(addr, 0x10_0000);
//!
//! let snapshot = table.snapshot().unwrap();
//! assert_eq!(snapshot.as_bytes().len(), 3 * 20);
//! ```
//!
//! # Thread Safety
//!
//! The table does no internal locking. It is `Send` but all mutation goes
//! through `&mut self`; when device setup runs on several threads, callers
//! must wrap the table in a mutex of their own.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod macros;

pub use self::{
    allocate::{ALIGNMENT_NONE, Strategy},
    error::{E820Error, E820ErrorKind},
    export::{DecodeError, E820Entry, FWCFG_FILE_NAME, FwCfgItem, Snapshot},
    layout::MemoryConfig,
    region::{MemoryKind, Region},
    resource::{ReserveResourcesError, Resource},
    table::{Boundary, DEFAULT_CAPACITY, E820Table},
};

mod allocate;
mod error;
mod export;
pub mod layout;
mod region;
mod resource;
mod table;
