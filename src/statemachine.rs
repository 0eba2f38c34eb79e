//! The 16-state IEEE 1149.1 TAP controller graph.  `next` gives the state
//! reached from a given state for a TMS value, and `route` gives the TMS value
//! that begins a shortest path from one state toward another.  Both are
//! constant table lookups; there is no runtime search, and any pair of states
//! is connected by at most 9 TMS steps.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JtagState {
    Reset = 0,
    Idle = 1,
    SelectDR = 2,
    CaptureDR = 3,
    ShiftDR = 4,
    Exit1DR = 5,
    PauseDR = 6,
    Exit2DR = 7,
    UpdateDR = 8,
    SelectIR = 9,
    CaptureIR = 10,
    ShiftIR = 11,
    Exit1IR = 12,
    PauseIR = 13,
    Exit2IR = 14,
    UpdateIR = 15,
}

impl JtagState {
    /// Decode a 4-bit state code.  Higher bits are ignored, so every byte maps
    /// to some valid state.
    pub fn from_code(code: u8) -> Self {
        match code & 0xf {
            0 => JtagState::Reset,
            1 => JtagState::Idle,
            2 => JtagState::SelectDR,
            3 => JtagState::CaptureDR,
            4 => JtagState::ShiftDR,
            5 => JtagState::Exit1DR,
            6 => JtagState::PauseDR,
            7 => JtagState::Exit2DR,
            8 => JtagState::UpdateDR,
            9 => JtagState::SelectIR,
            10 => JtagState::CaptureIR,
            11 => JtagState::ShiftIR,
            12 => JtagState::Exit1IR,
            13 => JtagState::PauseIR,
            14 => JtagState::Exit2IR,
            _ => JtagState::UpdateIR,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Transition table: entry `[s]` is the state reached from `s` with TMS low
/// and with TMS high.
const NEXT: [[JtagState; 2]; 16] = {
    use JtagState::*;
    [
        [Idle, Reset],         // Reset
        [Idle, SelectDR],      // Idle
        [CaptureDR, SelectIR], // SelectDR
        [ShiftDR, Exit1DR],    // CaptureDR
        [ShiftDR, Exit1DR],    // ShiftDR
        [PauseDR, UpdateDR],   // Exit1DR
        [PauseDR, Exit2DR],    // PauseDR
        [ShiftDR, UpdateDR],   // Exit2DR
        [Idle, SelectDR],      // UpdateDR
        [CaptureIR, Reset],    // SelectIR
        [ShiftIR, Exit1IR],    // CaptureIR
        [ShiftIR, Exit1IR],    // ShiftIR
        [PauseIR, UpdateIR],   // Exit1IR
        [PauseIR, Exit2IR],    // PauseIR
        [ShiftIR, UpdateIR],   // Exit2IR
        [Idle, SelectIR],      // UpdateIR
    ]
};

/// Routing table: bit `t` of entry `[s]` is the TMS value that begins a
/// shortest path from `s` to `t`.  For `s == t` the entry is the self-loop TMS
/// where the state has one, otherwise the first move of the shortest cycle
/// back to `s`.
const ROUTE: [u16; 16] = [
    0b0000000000000001, // Reset
    0b1111111111111101, // Idle
    0b1111111000000011, // SelectDR
    0b1111111111101111, // CaptureDR
    0b1111111111101111, // ShiftDR
    0b1111111100001111, // Exit1DR
    0b1111111110111111, // PauseDR
    0b1111111100001111, // Exit2DR
    0b1111111111111101, // UpdateDR
    0b0000000111111111, // SelectIR
    0b1111011111111111, // CaptureIR
    0b1111011111111111, // ShiftIR
    0b1000011111111111, // Exit1IR
    0b1101111111111111, // PauseIR
    0b1000011111111111, // Exit2IR
    0b1111111000000001, // UpdateIR
];

/// State reached from `state` by one TCK with the given TMS value.
pub fn next(state: JtagState, tms: bool) -> JtagState {
    NEXT[state as usize][usize::from(tms)]
}

/// TMS value that begins a shortest path from `state` toward `target`.
pub fn route(state: JtagState, target: JtagState) -> bool {
    ROUTE[state as usize] >> (target as usize) & 1 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> impl Iterator<Item = JtagState> {
        (0..16).map(JtagState::from_code)
    }

    #[test]
    fn route_converges_within_tap_diameter() {
        for start in all_states() {
            for target in all_states() {
                let mut state = start;
                let mut steps = 0;
                while state != target {
                    state = next(state, route(state, target));
                    steps += 1;
                    assert!(
                        steps <= 9,
                        "no path from {start:?} to {target:?} within 9 steps"
                    );
                }
            }
        }
    }

    #[test]
    fn five_tms_highs_reach_reset_from_anywhere() {
        for start in all_states() {
            let mut state = start;
            for _ in 0..5 {
                state = next(state, true);
            }
            assert_eq!(state, JtagState::Reset, "from {start:?}");
        }
    }

    #[test]
    fn stable_states_self_loop() {
        assert_eq!(next(JtagState::Reset, true), JtagState::Reset);
        for state in [
            JtagState::Idle,
            JtagState::ShiftDR,
            JtagState::PauseDR,
            JtagState::ShiftIR,
            JtagState::PauseIR,
        ] {
            assert_eq!(next(state, false), state);
            assert!(!route(state, state));
        }
        assert!(route(JtagState::Reset, JtagState::Reset));
    }

    #[test]
    fn shift_exits_toward_idle_with_tms_high() {
        assert!(route(JtagState::ShiftDR, JtagState::Idle));
        assert!(route(JtagState::ShiftIR, JtagState::Idle));
    }

    #[test]
    fn code_round_trips() {
        for state in all_states() {
            assert_eq!(JtagState::from_code(state.code()), state);
        }
    }
}
