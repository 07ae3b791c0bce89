//! A portable driver for SPI-attached NOR flash memories.
//!
//! The driver is generic over the SPI transport, the chip-select line and
//! the millisecond clock/delay source ([`transport`]), so it runs unmodified
//! on any microcontroller that exposes those three capabilities. It probes
//! the attached chip's JEDEC ID, derives its page/sector/block geometry and
//! picks three- or four-byte addressing automatically, then exposes a
//! byte-addressed read/program/erase API that always splits writes at
//! physical page boundaries.
//!
//! This crate does not cache reads, level wear, manage bad blocks, or
//! expose a block-device/filesystem adapter. It also does not implement the
//! SPI bus, chip-select GPIO, or clock itself — those are supplied by the
//! caller through the traits in [`transport`].

#![cfg_attr(not(test), no_std)]
#![warn(missing_debug_implementations)]

mod device;
mod erase;
mod error;
mod jedec;
mod opcode;
mod program;
mod read;
pub mod transport;

pub use device::Flash;
pub use error::Error;
pub use jedec::{CapacityCode, Geometry, Identification, Manufacturer};
pub use opcode::Status1;

/// Bytes in a program-atomic page. Program commands never cross this
/// boundary; the page-splitter in [`Flash::write_address`] guarantees it.
pub const PAGE_SIZE: u32 = 256;

/// Pages in one erase-atomic sector (4 KiB).
pub const PAGES_PER_SECTOR: u32 = 16;

/// Pages in one erase block (64 KiB).
pub const PAGES_PER_BLOCK: u32 = 256;

/// Bytes in one sector (4 KiB).
pub const SECTOR_SIZE: u32 = PAGE_SIZE * PAGES_PER_SECTOR;

/// Bytes in one erase block (64 KiB).
pub const BLOCK_SIZE: u32 = PAGE_SIZE * PAGES_PER_BLOCK;

/// Sectors per erase block.
pub const SECTORS_PER_BLOCK: u32 = PAGES_PER_BLOCK / PAGES_PER_SECTOR;

/// A device is addressed with 4-byte commands once it has at least this
/// many 64 KiB blocks (> 256 Mbit), per spec section 4.2.
pub const FOUR_BYTE_ADDR_BLOCK_THRESHOLD: u16 = 512;
