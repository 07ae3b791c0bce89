use core::cell::{Cell, RefCell};

use crate::jedec::Identification;
use crate::opcode::{Opcode, Status1};
use crate::transport::{elapsed_since, Bus, ChipSelect, Clock};
use crate::{CapacityCode, Error, Geometry, Manufacturer};

pub(crate) const REG_TIMEOUT: u32 = 100;
pub(crate) const PROGRAM_TIMEOUT: u32 = 100;
pub(crate) const SECTOR_ERASE_TIMEOUT: u32 = 1000;
pub(crate) const BLOCK_ERASE_TIMEOUT: u32 = 3000;
pub(crate) const CHIP_ERASE_TIMEOUT_PER_BLOCK: u32 = 1000;
pub(crate) const READ_TIMEOUT: u32 = 2000;
const PROBE_SETTLE_MS: u32 = 20;
const PROBE_BUSY_TIMEOUT_MS: u32 = 3000;

/// The transport parts bundled together, owned behind the [`Flash`]
/// handle's `RefCell`.
pub(crate) struct Transport<SPI, CS, CLK> {
    pub(crate) spi: SPI,
    pub(crate) cs: CS,
    pub(crate) clk: CLK,
}

impl<SPI, CS, CLK> Transport<SPI, CS, CLK>
where
    SPI: Bus,
    CS: ChipSelect,
    CLK: Clock,
{
    /// Runs `body` inside one CS-low window, deasserting CS on every exit
    /// path including an error return from `body` (spec section 4.1: "a
    /// command is one contiguous CS-low window").
    pub(crate) fn with_cs_asserted<T>(
        &mut self,
        body: impl FnOnce(&mut SPI) -> Result<T, SPI::Error>,
    ) -> Result<T, Error<SPI::Error>> {
        self.cs.set(false);
        let result = body(&mut self.spi).map_err(Error::Io);
        self.cs.set(true);
        result
    }

    fn command(&mut self, opcode: u8) -> Result<(), Error<SPI::Error>> {
        self.with_cs_asserted(|spi| {
            let tx = [opcode];
            let mut rx = [0u8];
            spi.transfer(&tx, &mut rx, REG_TIMEOUT)
        })
    }

    fn read_status(&mut self, opcode: u8) -> Result<u8, Error<SPI::Error>> {
        let mut rx = [0u8; 2];
        self.with_cs_asserted(|spi| {
            let tx = [opcode, 0];
            spi.transfer(&tx, &mut rx, REG_TIMEOUT)
        })?;
        Ok(rx[1])
    }

    pub(crate) fn read_status1(&mut self) -> Result<Status1, Error<SPI::Error>> {
        self.read_status(Opcode::ReadStatus1 as u8)
            .map(Status1::from_bits_truncate)
    }

    pub(crate) fn read_status2(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.read_status(Opcode::ReadStatus2 as u8)
    }

    pub(crate) fn read_status3(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.read_status(Opcode::ReadStatus3 as u8)
    }

    pub(crate) fn write_enable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(Opcode::WriteEnable as u8)
    }

    /// Best-effort write-disable: failures are swallowed, matching spec
    /// section 4.5 step 4 ("best-effort; failures not surfaced").
    pub(crate) fn write_disable_best_effort(&mut self) {
        let _ = self.command(Opcode::WriteDisable as u8);
    }

    /// Polls STATUS1.BUSY until clear or `timeout_ms` elapses (spec
    /// section 4.4). Unsigned wraparound in the millisecond counter never
    /// causes a premature timeout, see [`elapsed_since`].
    pub(crate) fn busy_wait(&mut self, timeout_ms: u32) -> Result<(), Error<SPI::Error>> {
        let t0 = self.clk.now_ms();
        loop {
            if elapsed_since(t0, self.clk.now_ms(), timeout_ms) {
                #[cfg(feature = "defmt")]
                defmt::warn!("busy-wait timed out after {} ms", timeout_ms);
                return Err(Error::Timeout);
            }
            if !self.read_status1()?.contains(Status1::BUSY) {
                return Ok(());
            }
            self.clk.delay_ms(1);
        }
    }

    fn jedec_id(&mut self) -> Result<[u8; 3], Error<SPI::Error>> {
        let mut rx = [0u8; 4];
        self.with_cs_asserted(|spi| {
            let tx = [Opcode::JedecId as u8, 0xFF, 0xFF, 0xFF];
            spi.transfer(&tx, &mut rx, REG_TIMEOUT)
        })?;
        Ok([rx[1], rx[2], rx[3]])
    }
}

/// RAII guard for the per-handle serializer (spec section 5). Acquiring a
/// `Lease` sets the busy flag; dropping it clears the flag unconditionally,
/// so every exit path of a public operation — including `?`-propagated
/// errors — releases it without the method author having to remember to.
pub(crate) struct Lease<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// A probed SPI NOR flash device.
///
/// `SPI` is the full-duplex transport ([`crate::transport::Bus`]), `CS` the
/// chip-select line ([`crate::transport::ChipSelect`]), `CLK` the
/// millisecond clock/delay source ([`crate::transport::Clock`]).
///
/// Public operations are serialized against each other via an internal
/// busy flag (spec section 5): they take `&self`, so a `Flash` can be
/// shared (e.g. wrapped in an `Rc`) across cooperative tasks on a single
/// executor without a caller-provided mutex.
pub struct Flash<SPI, CS, CLK> {
    pub(crate) transport: RefCell<Transport<SPI, CS, CLK>>,
    busy: Cell<bool>,
    pub manufacturer: Manufacturer,
    pub mem_type: u8,
    pub capacity_code: CapacityCode,
    pub geometry: Geometry,
}

impl<SPI, CS, CLK> core::fmt::Debug for Flash<SPI, CS, CLK> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Flash")
            .field("manufacturer", &self.manufacturer)
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl<SPI, CS, CLK> Flash<SPI, CS, CLK>
where
    SPI: Bus,
    CS: ChipSelect,
    CLK: Clock,
{
    /// Probes the attached chip and returns a ready-to-use handle.
    ///
    /// Fails with [`Error::Io`] if the transport is unusable, with
    /// [`Error::UnknownVendor`] if the manufacturer byte is unrecognized,
    /// or [`Error::UnsupportedSize`] if the capacity code is out of the
    /// supported range.
    pub fn init(spi: SPI, cs: CS, mut clk: CLK) -> Result<Self, Error<SPI::Error>> {
        clk.delay_ms(PROBE_SETTLE_MS);

        let mut transport = Transport { spi, cs, clk };
        // Unconditionally clear WEL before probing, matching
        // original_source/SPIFlash.c's SPIFlashInit; a stale BUSY from a
        // reset mid-erase is waited out rather than treated as fatal (see
        // SPEC_FULL.md Open Question 3).
        transport.write_disable_best_effort();
        let _ = transport.busy_wait(PROBE_BUSY_TIMEOUT_MS);

        let id_bytes = transport.jedec_id()?;
        let id = Identification::decode(id_bytes)?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "probed flash: manufacturer={:?} mem_type=0x{:02X} blocks={}",
            id.manufacturer,
            id.mem_type,
            id.geometry.block_count
        );

        Ok(Flash {
            transport: RefCell::new(transport),
            busy: Cell::new(false),
            manufacturer: id.manufacturer,
            mem_type: id.mem_type,
            capacity_code: id.capacity_code,
            geometry: id.geometry,
        })
    }

    /// Reads STATUS1.
    pub fn read_status1(&self) -> Result<Status1, Error<SPI::Error>> {
        let _lease = self.acquire();
        self.transport.borrow_mut().read_status1()
    }

    /// Reads STATUS2.
    pub fn read_status2(&self) -> Result<u8, Error<SPI::Error>> {
        let _lease = self.acquire();
        self.transport.borrow_mut().read_status2()
    }

    /// Reads STATUS3.
    pub fn read_status3(&self) -> Result<u8, Error<SPI::Error>> {
        let _lease = self.acquire();
        self.transport.borrow_mut().read_status3()
    }

    /// Reads STATUS1 and reports whether BUSY is set, without taking the
    /// serializer lease — intended for a caller polling readiness from
    /// outside a public operation.
    pub fn is_busy(&self) -> Result<bool, Error<SPI::Error>> {
        Ok(self
            .transport
            .borrow_mut()
            .read_status1()?
            .contains(Status1::BUSY))
    }

    /// Claims the serializer, cooperatively spinning 1 ms at a time while
    /// another public operation holds it (spec section 5: "on entry, if
    /// the flag is set, the core cooperatively sleeps for 1 ms").
    pub(crate) fn acquire(&self) -> Lease<'_> {
        while self.busy.replace(true) {
            self.transport.borrow_mut().clk.delay_ms(1);
        }
        Lease { flag: &self.busy }
    }
}
