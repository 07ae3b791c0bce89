use crate::device::{
    Flash, BLOCK_ERASE_TIMEOUT, CHIP_ERASE_TIMEOUT_PER_BLOCK, SECTOR_ERASE_TIMEOUT,
};
use crate::opcode::{encode_command, Opcode};
use crate::transport::{Bus, ChipSelect, Clock};
use crate::{Error, BLOCK_SIZE, SECTOR_SIZE};

impl<SPI, CS, CLK> Flash<SPI, CS, CLK>
where
    SPI: Bus,
    CS: ChipSelect,
    CLK: Clock,
{
    /// Erases the entire chip. Timeout scales with `block_count` (spec
    /// section 4.7: ~1 s per 64 KiB block, a conservative upper bound).
    pub fn erase_chip(&self) -> Result<(), Error<SPI::Error>> {
        let _lease = self.acquire();
        let timeout = self.geometry.block_count as u32 * CHIP_ERASE_TIMEOUT_PER_BLOCK;
        let mut transport = self.transport.borrow_mut();

        let result = (|| {
            transport.write_enable()?;
            transport.with_cs_asserted(|spi| {
                let tx = [Opcode::ChipErase as u8];
                let mut rx = [0u8];
                spi.transfer(&tx, &mut rx, crate::device::REG_TIMEOUT)
            })?;
            transport.busy_wait(timeout)
        })();

        transport.write_disable_best_effort();

        #[cfg(feature = "defmt")]
        if result.is_ok() {
            defmt::info!("chip erase complete");
        }

        result
    }

    /// Erases one 64 KiB block.
    pub fn erase_block(&self, block: u32) -> Result<(), Error<SPI::Error>> {
        if block >= self.geometry.block_count as u32 {
            return Err(Error::InvalidAddress);
        }
        self.erase_region(
            block * BLOCK_SIZE,
            Opcode::block_erase(self.geometry.addr_is_4byte),
            BLOCK_ERASE_TIMEOUT,
        )
    }

    /// Erases one 4 KiB sector.
    pub fn erase_sector(&self, sector: u32) -> Result<(), Error<SPI::Error>> {
        if sector >= self.geometry.sector_count {
            return Err(Error::InvalidAddress);
        }
        self.erase_region(
            sector * SECTOR_SIZE,
            Opcode::sector_erase(self.geometry.addr_is_4byte),
            SECTOR_ERASE_TIMEOUT,
        )
    }

    /// Shared skeleton for block/sector erase: WREN -> opcode+address ->
    /// busy-wait -> WRDI (spec section 4.7).
    fn erase_region(&self, address: u32, opcode: u8, timeout_ms: u32) -> Result<(), Error<SPI::Error>> {
        let _lease = self.acquire();
        let addr_is_4byte = self.geometry.addr_is_4byte;
        let mut transport = self.transport.borrow_mut();

        let result = (|| {
            transport.write_enable()?;
            transport.with_cs_asserted(|spi| {
                let mut cmd = [0u8; 5];
                let cmd_len = encode_command(&mut cmd, opcode, address, addr_is_4byte);
                let mut discard = [0u8; 5];
                spi.transfer(&cmd[..cmd_len], &mut discard[..cmd_len], crate::device::REG_TIMEOUT)
            })?;
            transport.busy_wait(timeout_ms)
        })();

        transport.write_disable_best_effort();
        result
    }
}
