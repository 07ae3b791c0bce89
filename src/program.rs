use crate::device::{Flash, PROGRAM_TIMEOUT};
use crate::opcode::{encode_command, Opcode};
use crate::transport::{Bus, ChipSelect, Clock};
use crate::{Error, BLOCK_SIZE, PAGE_SIZE, SECTOR_SIZE};

const PROGRAM_DATA_TIMEOUT: u32 = 1000;

impl<SPI, CS, CLK> Flash<SPI, CS, CLK>
where
    SPI: Bus,
    CS: ChipSelect,
    CLK: Clock,
{
    /// Programs up to one physical page. `data` longer than `256 - offset`
    /// is silently truncated (spec section 4.5 precondition) — this is the
    /// atomic program unit every public write entry point splits against.
    ///
    /// Caller must already hold the serializer lease (spec section 9: the
    /// lock is taken once by the public entry point, not per page —
    /// matching `original_source/SPIFlash.c`'s `SPIFlashWriteFn`, which is
    /// never itself wrapped in `SPIFlashLock`/`UnLock`).
    fn program_page_locked(
        &self,
        page: u32,
        data: &[u8],
        offset: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if page >= self.geometry.page_count || offset >= PAGE_SIZE {
            return Err(Error::InvalidAddress);
        }
        let max = PAGE_SIZE - offset;
        let len = core::cmp::min(data.len() as u32, max) as usize;
        let data = &data[..len];
        let address = (page << 8) | offset;

        let mut transport = self.transport.borrow_mut();
        let opcode = Opcode::page_program(self.geometry.addr_is_4byte);
        let addr_is_4byte = self.geometry.addr_is_4byte;

        let result = (|| {
            transport.write_enable()?;
            transport.with_cs_asserted(|spi| {
                let mut cmd = [0u8; 5];
                let cmd_len = encode_command(&mut cmd, opcode, address, addr_is_4byte);
                let mut discard_cmd = [0u8; 5];
                spi.transfer(&cmd[..cmd_len], &mut discard_cmd[..cmd_len], PROGRAM_TIMEOUT)?;
                let mut discard_data = [0u8; PAGE_SIZE as usize];
                spi.transfer(data, &mut discard_data[..data.len()], PROGRAM_DATA_TIMEOUT)
            })?;
            transport.busy_wait(PROGRAM_TIMEOUT)
        })();

        transport.write_disable_best_effort();

        #[cfg(feature = "defmt")]
        if result.is_ok() {
            defmt::debug!("programmed page {} ({} bytes at offset {})", page, data.len(), offset);
        }

        result
    }

    /// Splits `data` into `program_page_locked` calls aligned to 256-byte
    /// page boundaries, starting at `start` (spec section 4.6). The first
    /// and last chunks may be partial; every interior chunk is a full page.
    ///
    /// Caller must already hold the serializer lease.
    fn program_range_locked(&self, start: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        let mut remaining = data.len();
        let mut cur = start;
        let mut i = 0usize;

        while remaining > 0 {
            let page = cur >> 8;
            let off = cur & 0xFF;
            let chunk = core::cmp::min(remaining, (PAGE_SIZE - off) as usize);
            self.program_page_locked(page, &data[i..i + chunk], off)?;
            cur += chunk as u32;
            i += chunk;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Byte-addressed write: splits `data` across as many pages as needed
    /// (spec section 4.6). Takes the serializer lease once for the whole
    /// call, so no other public operation can interleave between pages
    /// (spec section 3: "no two public operations on the same handle
    /// overlap").
    pub fn write_address(&self, address: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        let _lease = self.acquire();
        self.program_range_locked(address, data)
    }

    /// Convenience wrapper: writes at `(page, offset)`, clamping `data` to
    /// the page boundary rather than erroring (spec section 9: "silent
    /// truncation... a contract callers rely on").
    pub fn write_page(&self, page: u32, data: &[u8], offset: u32) -> Result<(), Error<SPI::Error>> {
        let _lease = self.acquire();
        self.program_page_locked(page, data, offset)
    }

    /// Writes within a sector, clamping `data` so the write never crosses
    /// into the next sector (spec section 4.6). Locked for the duration of
    /// the whole write, not per page.
    pub fn write_sector(
        &self,
        sector: u32,
        data: &[u8],
        offset: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if sector >= self.geometry.sector_count || offset >= SECTOR_SIZE {
            return Err(Error::InvalidAddress);
        }
        let len = core::cmp::min(data.len() as u32, SECTOR_SIZE - offset) as usize;
        let _lease = self.acquire();
        self.program_range_locked(sector * SECTOR_SIZE + offset, &data[..len])
    }

    /// Writes within a block, clamping `data` so the write never crosses
    /// into the next block (spec section 4.6). Locked for the duration of
    /// the whole write, not per page.
    pub fn write_block(
        &self,
        block: u32,
        data: &[u8],
        offset: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if block >= self.geometry.block_count as u32 || offset >= BLOCK_SIZE {
            return Err(Error::InvalidAddress);
        }
        let len = core::cmp::min(data.len() as u32, BLOCK_SIZE - offset) as usize;
        let _lease = self.acquire();
        self.program_range_locked(block * BLOCK_SIZE + offset, &data[..len])
    }
}
