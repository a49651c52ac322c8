use thiserror::Error;

use crate::frame::{A_HDR_LEN, PKT_BUF_LEN, S_HDR_LEN, T_HDR_LEN};

/// Longest accepted epoch period, in timer ticks (512 s at 32 kHz).
pub const MAX_PERIOD: u32 = 0x0100_0000;

/// Longest accepted scan budget, in epochs.
pub const MAX_SCAN_EPOCHS: u8 = 200;

/// Protocol configuration, fixed for the whole run at
/// [`start`][crate::driver::Crystal::start].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Epoch length in timer ticks. `0 < period <=` [`MAX_PERIOD`].
    pub period: u32,

    /// Whether this node is the sink.
    pub is_sink: bool,

    /// Flood retransmissions in S slots.
    pub ntx_s: u8,
    /// Maximum S slot duration in timer ticks.
    pub w_s: u16,
    /// Application payload bytes in S frames.
    pub plds_s: u8,

    /// Flood retransmissions in T slots.
    pub ntx_t: u8,
    /// Maximum T slot duration in timer ticks.
    pub w_t: u16,
    /// Application payload bytes in T frames.
    pub plds_t: u8,

    /// Flood retransmissions in A slots.
    pub ntx_a: u8,
    /// Maximum A slot duration in timer ticks.
    pub w_a: u16,
    /// Application payload bytes in A frames.
    pub plds_a: u8,

    /// Consecutive empty T slots after which the sink ends the epoch
    /// (forced to 1 while at TA pair 1).
    pub r: u8,
    /// Consecutive empty TA pairs after which a non-transmitting
    /// non-sink ends the epoch.
    pub y: u8,
    /// Consecutive unacknowledged A slots after which a transmitting
    /// non-sink ends the epoch.
    pub z: u8,
    /// Consecutive T slots with radio reception errors after which the
    /// sink ends the epoch; zero disables the rule.
    pub x: u8,
    /// A-slot reception errors tolerated by a non-sink before one
    /// counts as a missing ack; zero disables the error accounting.
    pub xa: u8,

    /// Epochs during which the termination rules above are suspended,
    /// so a fresh network runs full-length epochs while nodes join.
    pub n_full_epochs: u16,

    /// Capture reference time from A floods as well as S floods.
    pub sync_acks: bool,

    /// Channel whitelist. Retained for the multi-channel extension;
    /// inert on the single-channel core.
    pub ch_whitelist: u16,

    /// Scan budget as a multiple of `period`.
    /// `0 < scan_duration <=` [`MAX_SCAN_EPOCHS`].
    pub scan_duration: u8,

    /// Radio- and platform-dependent tunables.
    pub timing: Timing,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            period: 32768,
            is_sink: false,
            ntx_s: 2,
            w_s: 164,
            plds_s: 0,
            ntx_t: 2,
            w_t: 164,
            plds_t: 0,
            ntx_a: 2,
            w_a: 82,
            plds_a: 0,
            r: 2,
            y: 2,
            z: 4,
            x: 0,
            xa: 0,
            n_full_epochs: 1,
            sync_acks: true,
            ch_whitelist: 0xFFFF,
            scan_duration: MAX_SCAN_EPOCHS,
            timing: Timing::default(),
        }
    }
}

impl Config {
    pub(crate) fn s_total_len(&self) -> u8 {
        (S_HDR_LEN + self.plds_s as usize) as u8
    }

    pub(crate) fn t_total_len(&self) -> u8 {
        (T_HDR_LEN + self.plds_t as usize) as u8
    }

    pub(crate) fn a_total_len(&self) -> u8 {
        (A_HDR_LEN + self.plds_a as usize) as u8
    }

    pub(crate) fn validate(&self) -> Result<(), StartError> {
        if S_HDR_LEN + self.plds_s as usize > PKT_BUF_LEN {
            return Err(StartError::SPayloadTooLong);
        }
        if T_HDR_LEN + self.plds_t as usize > PKT_BUF_LEN {
            return Err(StartError::TPayloadTooLong);
        }
        if A_HDR_LEN + self.plds_a as usize > PKT_BUF_LEN {
            return Err(StartError::APayloadTooLong);
        }
        if self.period == 0 {
            return Err(StartError::ZeroPeriod);
        }
        if self.period > MAX_PERIOD {
            return Err(StartError::PeriodTooLong);
        }
        if self.scan_duration == 0 {
            return Err(StartError::ZeroScanDuration);
        }
        if self.scan_duration > MAX_SCAN_EPOCHS {
            return Err(StartError::ScanDurationTooLong);
        }
        Ok(())
    }
}

/// Tick-domain constants of the radio and board, as tunables.
///
/// Defaults are the DW1000/evb1000 values at 32768 ticks per second.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timing {
    /// Gap between consecutive phases.
    pub inter_phase_gap: u32,
    /// Wide guard while the clock skew is not yet estimated.
    pub init_guard: u32,
    /// S-slot guard once synchronized.
    pub long_guard: u32,
    /// T/A receive guard.
    pub short_guard: u32,
    /// T/A receive guard when no sync happened this epoch.
    pub short_guard_nosync: u32,
    /// Extra tail on the sink's T slot, to give late packets a chance.
    pub sink_end_guard: u32,
    /// Compensation for the offset between the initiator's transmit
    /// reference and a receiver's frame-delimiter capture. Zero on
    /// radios whose flood primitive compensates internally (DW1000).
    pub ref_shift: u32,
    /// Listen-slot width during the bootstrap scan.
    pub scan_slot_duration: u32,
    /// Radio oscillator stabilization time after power-up.
    pub osc_stab_time: u32,
    /// Lead time the flood primitive needs between `start` and the
    /// first transmission.
    pub flood_pre_time: u32,
    /// How long before the next epoch the pre-epoch callback fires.
    pub app_pre_epoch_cb_time: u32,
    /// Epoch-tail reserve for application processing.
    pub time_for_app: u32,
}

impl Default for Timing {
    fn default() -> Timing {
        Timing {
            inter_phase_gap: 33,
            init_guard: 33,
            long_guard: 5,
            short_guard: 5,
            short_guard_nosync: 5,
            sink_end_guard: 8,
            ref_shift: 0,
            scan_slot_duration: 1638,
            osc_stab_time: 18,
            flood_pre_time: 16,
            app_pre_epoch_cb_time: 66,
            time_for_app: 98,
        }
    }
}

/// Why [`start`][crate::driver::Crystal::start] rejected a configuration.
#[derive(Error, Clone, Copy, PartialEq, Eq, Debug)]
pub enum StartError {
    #[error("S header and payload exceed the packet buffer")]
    SPayloadTooLong,
    #[error("T header and payload exceed the packet buffer")]
    TPayloadTooLong,
    #[error("A header and payload exceed the packet buffer")]
    APayloadTooLong,
    #[error("period cannot be zero")]
    ZeroPeriod,
    #[error("period greater than the maximum period")]
    PeriodTooLong,
    #[error("scan duration cannot be zero")]
    ZeroScanDuration,
    #[error("scan duration greater than the maximum scan budget")]
    ScanDurationTooLong,
}
