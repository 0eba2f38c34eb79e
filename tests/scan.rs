//! End-to-end scans: hex vector in, register transactions across the bus,
//! engine shifting against a loopback device, hex vector back out.

use proptest::prelude::*;

use jtag_ate::bridge::RegisterBridge;
use jtag_ate::bus::SystemBus;
use jtag_ate::driver::ScanDriver;
use jtag_ate::dut::{Loopback, Trace};
use jtag_ate::statemachine::JtagState;

type Bench = ScanDriver<RegisterBridge<Trace<Loopback>>>;

fn bench_with_latency(latency: usize) -> Bench {
    let bridge = RegisterBridge::new(Trace::new(Loopback::with_latency(latency)));
    ScanDriver::new(SystemBus::new(bridge))
}

fn bench() -> Bench {
    bench_with_latency(0)
}

#[test]
fn identity_loopback_scenarios() {
    let mut bench = bench();
    assert_eq!(bench.scan_ir(8, "55").unwrap(), "55");
    assert_eq!(bench.scan_ir(12, "0A55").unwrap(), "A55");
    assert_eq!(bench.scan_dr(8, "55").unwrap(), "55");
    assert_eq!(bench.scan_dr(12, "AAA").unwrap(), "AAA");
    assert_eq!(
        bench.scan_dr(64, "0123456789ABCDEF").unwrap(),
        "0123456789ABCDEF"
    );
}

#[test]
fn full_buffer_round_trip() {
    let mut bench = bench();
    let vector = "5A".repeat(1024);
    assert_eq!(bench.scan_dr(8192, &vector).unwrap(), vector);
}

#[test]
fn padding_is_equivalent_to_an_explicit_zero_nibble() {
    let mut padded = bench();
    let mut explicit = bench();
    let a = padded.scan_ir(8, "0").unwrap();
    let b = explicit.scan_ir(8, "00").unwrap();
    assert_eq!(a, b);
    assert_eq!(
        padded.bus().device().engine().buffer().read_byte(0),
        explicit.bus().device().engine().buffer().read_byte(0)
    );
}

#[test]
fn decoded_length_is_ceil_count_over_four() {
    for count in 1..=32usize {
        if count % 4 == 0 {
            continue;
        }
        let digits = count.div_ceil(4);
        let mut bench = bench();
        let tdo = bench.scan_dr(count, &"5".repeat(digits)).unwrap();
        assert_eq!(tdo.len(), digits, "count {count}");
    }
}

#[test]
fn runtest_holds_idle_for_exactly_the_requested_ticks() {
    let mut bench = bench();
    bench.state(JtagState::Idle).unwrap();
    bench
        .bus_mut()
        .device_mut()
        .engine_mut()
        .dut_mut()
        .pulses
        .clear();

    bench.runtest(2500).unwrap();

    let pulses = &bench.bus().device().engine().dut().pulses;
    assert_eq!(pulses.len(), 2500);
    assert!(
        pulses.iter().all(|(tms, _)| !tms),
        "runtest must stay on the Run-Test/Idle self-loop"
    );
    assert_eq!(
        bench.bus().device().engine().ctrl.cur_state,
        JtagState::Idle
    );
}

#[test]
fn tap_reset_leaves_test_logic_reset() {
    let mut bench = bench();
    bench.state(JtagState::PauseDR).unwrap();
    bench.tap_reset().unwrap();
    assert_eq!(
        bench.bus().device().engine().ctrl.cur_state,
        JtagState::Reset
    );
}

/// Reference model for the loopback delay line, fed the same preamble the
/// engine produces on its way to the shift state.
fn expected_capture(
    input: &[u8],
    count: usize,
    latency: usize,
    preamble: usize,
) -> Vec<bool> {
    let mut line = std::collections::VecDeque::new();
    line.resize(latency, false);
    let mut shift = |tdi: bool| -> bool {
        line.push_back(tdi);
        line.pop_front().unwrap_or(tdi)
    };
    for _ in 0..preamble {
        shift(true);
    }
    (0..count)
        .map(|i| shift(input[i / 8] >> (i % 8) & 1 != 0))
        .collect()
}

proptest! {
    #[test]
    fn echo_dut_reproduces_the_vector_once_latency_is_subtracted(
        bytes in proptest::collection::vec(any::<u8>(), 1..=64),
        count_seed in any::<prop::sample::Index>(),
        latency in 0usize..=8,
        ir in any::<bool>(),
    ) {
        let count = 1 + count_seed.index(bytes.len() * 8);
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();

        let mut bench = bench_with_latency(latency);
        let tdo = if ir {
            bench.scan_ir(count, &hex).unwrap()
        } else {
            bench.scan_dr(count, &hex).unwrap()
        };
        prop_assert_eq!(tdo.len(), count.div_ceil(4));

        // What the engine wrote into the buffer, bit for bit.
        let mut packed: Vec<u8> = bytes.iter().rev().copied().collect();
        packed.resize(count.div_ceil(8), 0);
        // Reset -> ShiftDR is 4 TMS steps, Reset -> ShiftIR is 5, all TDI-high.
        let preamble = if ir { 5 } else { 4 };
        let expected = expected_capture(&packed, count, latency, preamble);

        let buffer = bench.bus().device().engine().buffer();
        for (i, want) in expected.iter().enumerate() {
            prop_assert_eq!(buffer.read_bit(i), *want, "bit {}", i);
        }
    }

    #[test]
    fn zero_latency_whole_byte_scans_are_identity(
        bytes in proptest::collection::vec(any::<u8>(), 1..=64),
    ) {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        let mut bench = bench();
        prop_assert_eq!(bench.scan_dr(bytes.len() * 8, &hex).unwrap(), hex);
    }
}
