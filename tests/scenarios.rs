mod common;

use common::harness;
use spi_nor_flash::{Error, Flash, Manufacturer};

#[test]
fn s1_page_aligned_program() {
    let (bus, cs, clk, _state) = harness([0xEF, 0x40, 0x15], 32 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();

    flash.erase_sector(0).unwrap();
    flash.write_address(0, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    let mut buf = [0u8; 4];
    flash.read_address(0, &mut buf).unwrap();
    assert_eq!(buf, [0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn s2_cross_page_split_emits_two_program_frames() {
    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x15], 32 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();
    flash.erase_sector(0).unwrap();
    state.borrow_mut().trace.clear();

    flash
        .write_address(0xFE, &[0xAA, 0xBB, 0xCC, 0xDD])
        .unwrap();

    let opcodes: Vec<u8> = state
        .borrow()
        .trace
        .iter()
        .copied()
        .filter(|&b| b == 0x02)
        .collect();
    assert_eq!(opcodes.len(), 2, "expected exactly two page-program frames");

    let mut buf = [0u8; 4];
    flash.read_address(0xFE, &mut buf).unwrap();
    assert_eq!(buf, [0xAA, 0xBB, 0xCC, 0xDD]);
}

#[test]
fn s3_four_byte_mode_opcode_and_address() {
    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x20], 1024 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();
    assert!(flash.geometry.addr_is_4byte);
    state.borrow_mut().trace.clear();

    flash.write_address(0x01020304, &[0x00]).unwrap();

    let trace = state.borrow().trace.clone();
    let op_pos = trace.iter().position(|&b| b == 0x12).expect("0x12 frame");
    assert_eq!(trace[op_pos], 0x12);
}

#[test]
fn s4_busy_timeout_ends_with_wrdi() {
    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x15], 32 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();
    state.borrow_mut().busy_forever = true;
    state.borrow_mut().trace.clear();

    let err = flash.erase_sector(0).unwrap_err();
    assert!(matches!(err, Error::Timeout));

    let trace = state.borrow().trace.clone();
    assert_eq!(*trace.last().unwrap(), 0x04, "trace must end with WRDI");
    assert!(trace.iter().filter(|&&b| b == 0x05).count() >= 1);
}

#[test]
fn s5_invalid_sector_emits_zero_bytes() {
    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x15], 32 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();
    assert_eq!(flash.geometry.sector_count, 512);
    state.borrow_mut().trace.clear();

    let err = flash.erase_sector(512).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress));
    assert!(state.borrow().trace.is_empty());
}

#[test]
fn s6_identify() {
    let (bus, cs, clk, _state) = harness([0xEF, 0x40, 0x18], 256 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();

    assert_eq!(flash.manufacturer, Manufacturer::Winbond);
    assert_eq!(flash.capacity_code.raw(), 0x18);
    assert_eq!(flash.geometry.block_count, 256);
    assert!(!flash.geometry.addr_is_4byte);
}
