mod common;

use common::harness;
use proptest::prelude::*;
use spi_nor_flash::{Error, Flash};

const CAPACITY: usize = 131072; // cap 0x11, 1 Mbit, 2 blocks

proptest! {
    /// Property 1: write(a, s) followed by read(a, buf) yields buf == s,
    /// given the region was erased first.
    #[test]
    fn write_read_roundtrip(addr in 0u32..CAPACITY as u32, len in 0usize..=300) {
        prop_assume!(addr as usize + len <= CAPACITY);
        let (bus, cs, clk, _state) = harness([0xEF, 0x40, 0x11], CAPACITY);
        let flash = Flash::init(bus, cs, clk).unwrap();
        flash.erase_chip().unwrap();

        let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(addr as u8)).collect();
        flash.write_address(addr, &data).unwrap();

        let mut buf = vec![0u8; len];
        flash.read_address(addr, &mut buf).unwrap();
        prop_assert_eq!(buf, data);
    }

    /// Property 2: erase_sector(k) leaves its 4 KiB region all-0xFF and
    /// disturbs nothing outside it.
    #[test]
    fn erase_sector_is_isolated(k in 0u32..32, filler in 0u8..0xFF) {
        let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x11], CAPACITY);
        let flash = Flash::init(bus, cs, clk).unwrap();
        state.borrow_mut().data.iter_mut().for_each(|b| *b = filler);

        flash.erase_sector(k).unwrap();

        let store = state.borrow().data.clone();
        let start = k as usize * 4096;
        prop_assert!(store[start..start + 4096].iter().all(|&b| b == 0xFF));
        prop_assert!(store[..start].iter().all(|&b| b == filler));
        prop_assert!(store[start + 4096..].iter().all(|&b| b == filler));
    }

    /// Property 3: every program frame the driver emits lies entirely
    /// within one 256-byte page.
    #[test]
    fn program_frames_never_cross_a_page(addr in 0u32..CAPACITY as u32, len in 1usize..=600) {
        prop_assume!(addr as usize + len <= CAPACITY);
        let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x11], CAPACITY);
        let flash = Flash::init(bus, cs, clk).unwrap();
        flash.erase_chip().unwrap();

        let data = vec![0u8; len];
        flash.write_address(addr, &data).unwrap();

        for (frame_addr, frame_len) in state.borrow().program_frames.iter().copied() {
            prop_assert!((frame_addr & 0xFF) as usize + frame_len <= 256);
        }
    }

    /// Property 6: out-of-range region calls emit no SPI bytes and return
    /// `InvalidAddress`.
    #[test]
    fn out_of_range_is_silent(extra in 0u32..16) {
        let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x11], CAPACITY);
        let flash = Flash::init(bus, cs, clk).unwrap();
        state.borrow_mut().trace.clear();

        let err = flash.erase_sector(flash.geometry.sector_count + extra).unwrap_err();
        prop_assert!(matches!(err, Error::InvalidAddress));
        prop_assert!(state.borrow().trace.is_empty());
    }
}

/// Property 4: every write/erase bus trace matches WREN, OP, zero-or-more
/// STATUS1 reads, WRDI.
#[test]
fn write_and_erase_traces_are_wren_op_busy_wrdi() {
    fn assert_wren_op_busy_wrdi(trace: &[u8]) {
        assert_eq!(trace[0], 0x06, "frame must open with WREN");
        assert_eq!(*trace.last().unwrap(), 0x04, "frame must close with WRDI");
        assert!(trace[2..trace.len() - 1].iter().all(|&b| b == 0x05));
    }

    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x11], CAPACITY);
    let flash = Flash::init(bus, cs, clk).unwrap();

    state.borrow_mut().trace.clear();
    flash.erase_sector(0).unwrap();
    assert_wren_op_busy_wrdi(&state.borrow().trace);

    state.borrow_mut().trace.clear();
    flash.write_address(0, &[0x00]).unwrap();
    assert_wren_op_busy_wrdi(&state.borrow().trace);
}

/// Property 5: 4-byte-address opcodes are used iff capacity_code == 0x20.
#[test]
fn four_byte_opcodes_used_iff_capacity_0x20() {
    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x11], CAPACITY);
    let flash = Flash::init(bus, cs, clk).unwrap();
    flash.write_address(0, &[0x00]).unwrap();
    flash.read_address(0, &mut [0u8]).unwrap();
    flash.erase_sector(0).unwrap();
    let trace = state.borrow().trace.clone();
    assert!(!trace.iter().any(|b| matches!(b, 0x12 | 0x13 | 0x21 | 0xDC)));

    let (bus, cs, clk, state) = harness([0xEF, 0x40, 0x20], 1024 * 65536);
    let flash = Flash::init(bus, cs, clk).unwrap();
    flash.write_address(0, &[0x00]).unwrap();
    flash.read_address(0, &mut [0u8]).unwrap();
    flash.erase_sector(0).unwrap();
    let trace = state.borrow().trace.clone();
    assert!(trace.contains(&0x12));
    assert!(trace.contains(&0x13));
    assert!(trace.contains(&0x21));
    assert!(!trace.iter().any(|b| matches!(b, 0x02 | 0x03 | 0x20)));
}
