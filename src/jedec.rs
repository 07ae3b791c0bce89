//! JEDEC manufacturer/capacity decoding and the geometry derived from it.

use crate::FOUR_BYTE_ADDR_BLOCK_THRESHOLD;

/// Known JEDEC manufacturer IDs (spec section 4.2). A byte not in this
/// table is not a valid device state: [`Identification::decode`] fails
/// the probe with [`crate::Error::UnknownVendor`] instead of constructing
/// a `Manufacturer` for it (spec section 4.2 mandates a hard failure
/// here, so there is no "unknown manufacturer" variant to construct).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Manufacturer {
    Winbond,
    Spansion,
    Micron,
    Macronix,
    Issi,
    GigaDevice,
    Amic,
    Sst,
    Hyundai,
    Atmel,
    Fudan,
    Esmt,
    Intel,
    Sanyo,
    Fujitsu,
    Eon,
    Puya,
}

impl Manufacturer {
    fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0xEF => Manufacturer::Winbond,
            0x01 => Manufacturer::Spansion,
            0x20 => Manufacturer::Micron,
            0xC2 => Manufacturer::Macronix,
            0xD5 => Manufacturer::Issi,
            0xC8 => Manufacturer::GigaDevice,
            0x37 => Manufacturer::Amic,
            0xBF => Manufacturer::Sst,
            0xAD => Manufacturer::Hyundai,
            0x1F => Manufacturer::Atmel,
            0xA1 => Manufacturer::Fudan,
            0x8C => Manufacturer::Esmt,
            0x89 => Manufacturer::Intel,
            0x62 => Manufacturer::Sanyo,
            0x04 => Manufacturer::Fujitsu,
            0x1C => Manufacturer::Eon,
            0x85 => Manufacturer::Puya,
            _ => return None,
        })
    }
}

/// JEDEC capacity code (third ID byte), covering 1–512 Mbit (spec section 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityCode(u8);

impl CapacityCode {
    /// Builds a `CapacityCode` from a raw JEDEC byte, rejecting anything
    /// outside 0x11..=0x19 (1–256 Mbit) and 0x20 (512 Mbit).
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x11..=0x19 | 0x20 => Some(CapacityCode(byte)),
            _ => None,
        }
    }

    /// Raw JEDEC capacity byte.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// `block_count = 2^(code - 0x10)` for 0x11..=0x19, and 1024 for 0x20
    /// (spec section 4.2).
    fn block_count(self) -> u16 {
        if self.0 == 0x20 {
            1024
        } else {
            1u16 << (self.0 - 0x10)
        }
    }
}

/// The JEDEC identification tuple plus the geometry derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identification {
    pub manufacturer: Manufacturer,
    pub mem_type: u8,
    pub capacity_code: CapacityCode,
    pub geometry: Geometry,
}

impl Identification {
    /// Decodes the three bytes captured after a JEDEC ID (0x9F) command:
    /// `[manufacturer, mem_type, capacity_code]`.
    pub(crate) fn decode<E>(bytes: [u8; 3]) -> Result<Self, crate::Error<E>> {
        let manufacturer =
            Manufacturer::from_byte(bytes[0]).ok_or(crate::Error::UnknownVendor(bytes[0]))?;
        let capacity_code =
            CapacityCode::from_byte(bytes[2]).ok_or(crate::Error::UnsupportedSize(bytes[2]))?;
        Ok(Identification {
            manufacturer,
            mem_type: bytes[1],
            capacity_code,
            geometry: Geometry::from_block_count(capacity_code.block_count()),
        })
    }
}

/// Device geometry, constant for the lifetime of a probed [`crate::Flash`]
/// handle (spec section 3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub block_count: u16,
    pub sector_count: u32,
    pub page_count: u32,
    pub addr_is_4byte: bool,
}

impl Geometry {
    fn from_block_count(block_count: u16) -> Self {
        Geometry {
            block_count,
            sector_count: (block_count as u32) << 4,
            page_count: (block_count as u32) << 8,
            addr_is_4byte: block_count >= FOUR_BYTE_ADDR_BLOCK_THRESHOLD,
        }
    }
}
