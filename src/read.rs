use crate::device::{Flash, READ_TIMEOUT};
use crate::opcode::{encode_command, Opcode};
use crate::transport::{Bus, ChipSelect, Clock};
use crate::{Error, BLOCK_SIZE, PAGE_SIZE, SECTOR_SIZE};

impl<SPI, CS, CLK> Flash<SPI, CS, CLK>
where
    SPI: Bus,
    CS: ChipSelect,
    CLK: Clock,
{
    /// Streams `buf.len()` bytes starting at `address` in a single SPI
    /// transaction. No busy-wait is issued first (spec section 4.8): the
    /// serializer already guarantees no program/erase is in flight on this
    /// handle.
    pub fn read_address(&self, address: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let _lease = self.acquire();
        let addr_is_4byte = self.geometry.addr_is_4byte;
        let opcode = Opcode::read(addr_is_4byte);
        let mut transport = self.transport.borrow_mut();

        transport.with_cs_asserted(|spi| {
            let mut cmd = [0u8; 5];
            let cmd_len = encode_command(&mut cmd, opcode, address, addr_is_4byte);
            let mut discard_cmd = [0u8; 5];
            spi.transfer(&cmd[..cmd_len], &mut discard_cmd[..cmd_len], crate::device::REG_TIMEOUT)?;
            read_with_dummy(spi, buf, READ_TIMEOUT)
        })
    }

    /// Reads within a page, clamping `size` to the page boundary (spec
    /// section 4.8).
    pub fn read_page(&self, page: u32, buf: &mut [u8], offset: u32) -> Result<(), Error<SPI::Error>> {
        if page >= self.geometry.page_count || offset >= PAGE_SIZE {
            return Err(Error::InvalidAddress);
        }
        let len = core::cmp::min(buf.len() as u32, PAGE_SIZE - offset) as usize;
        self.read_address((page << 8) | offset, &mut buf[..len])
    }

    /// Reads within a sector, clamping `size` to the sector boundary.
    pub fn read_sector(
        &self,
        sector: u32,
        buf: &mut [u8],
        offset: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if sector >= self.geometry.sector_count || offset >= SECTOR_SIZE {
            return Err(Error::InvalidAddress);
        }
        let len = core::cmp::min(buf.len() as u32, SECTOR_SIZE - offset) as usize;
        self.read_address(sector * SECTOR_SIZE + offset, &mut buf[..len])
    }

    /// Reads within a block, clamping `size` to the block boundary.
    pub fn read_block(
        &self,
        block: u32,
        buf: &mut [u8],
        offset: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if block >= self.geometry.block_count as u32 || offset >= BLOCK_SIZE {
            return Err(Error::InvalidAddress);
        }
        let len = core::cmp::min(buf.len() as u32, BLOCK_SIZE - offset) as usize;
        self.read_address(block * BLOCK_SIZE + offset, &mut buf[..len])
    }
}

/// Full-duplex transfer where the outbound bytes are irrelevant (dummy
/// clocks) and only the captured bytes matter. Chunked against a small
/// stack-resident zero buffer so an arbitrary (sector/block-sized) `buf`
/// never demands a matching stack allocation.
fn read_with_dummy<SPI: crate::transport::Bus>(
    spi: &mut SPI,
    buf: &mut [u8],
    timeout_ms: u32,
) -> Result<(), SPI::Error> {
    const CHUNK: usize = 64;
    let dummy = [0u8; CHUNK];
    for out in buf.chunks_mut(CHUNK) {
        spi.transfer(&dummy[..out.len()], out, timeout_ms)?;
    }
    Ok(())
}
