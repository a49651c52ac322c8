//! Contract Crystal requires from the concurrent-transmission flood
//! primitive.
//!
//! A flood (one "pulse") propagates a single frame across the whole
//! network: the initiator transmits, every receiver retransmits on
//! reception, and — when started with [`SyncMode::WithSync`] — each
//! receiver captures the local timestamp corresponding to the
//! initiator's transmit reference, within a bounded radio-dependent
//! error. Crystal never talks to the radio directly; it starts a flood
//! at an absolute slot start, stops it at the absolute slot stop, and
//! harvests the [`Harvest`].

use crate::frame::Addr;
use crate::timing::Ticks;

/// Listen-and-relay floods pass this as the initiator.
pub const UNKNOWN_INITIATOR: Addr = 0;

/// Let the flood accept any frame length (channel scan).
pub const UNKNOWN_PAYLOAD_LEN: u8 = 0;

/// Let the flood retransmit indefinitely until stopped (channel scan).
pub const UNKNOWN_N_TX: u8 = 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncMode {
    /// Capture the initiator's transmit reference on first reception.
    WithSync,
    WithoutSync,
}

/// Per-pulse parameters handed to [`Flood::start`].
#[derive(Clone, Copy, Debug)]
pub struct FloodParams {
    /// Transmit if this equals the local node id, listen and relay
    /// otherwise. [`UNKNOWN_INITIATOR`] listens for anyone.
    pub initiator: Addr,
    /// Expected total frame length, or [`UNKNOWN_PAYLOAD_LEN`].
    pub frame_len: u8,
    /// Number of retransmissions, or [`UNKNOWN_N_TX`].
    pub n_tx: u8,
    pub sync: SyncMode,
}

/// Radio status word of the last pulse, pre-decoded by the collaborator.
///
/// Which bits of the raw status register constitute a reception error is
/// a property of the radio variant, like `ref_shift`; the protocol only
/// consumes the decoded flags and logs the raw word.
#[derive(Clone, Copy, Default, Debug)]
pub struct RadioStatus {
    pub raw: u32,
    /// PHY-level reception error (SFD timeout, PHY header error, frame
    /// rejection, Reed-Solomon failure, FCS error, ...).
    pub reception_error: bool,
    /// A frame was received but failed its CRC.
    pub corrupted: bool,
}

/// Everything a finished pulse reports back.
#[derive(Clone, Copy, Default, Debug)]
pub struct Harvest {
    pub n_rx: u8,
    pub n_tx: u8,
    /// Length of the received frame, if any.
    pub payload_len: u8,
    /// Whether `t_ref` holds a valid reference capture for this pulse.
    pub t_ref_updated: bool,
    /// Local time of the initiator's transmit reference.
    pub t_ref: Ticks,
    /// Relay counter of the first reception; a hop-count estimate.
    pub relay_cnt_first_rx: u8,
    /// Initiator id recovered from the pulse.
    pub initiator: Addr,
    pub status: RadioStatus,
    /// Radio-on time of the pulse in timer ticks, zero if the platform
    /// does not account for it.
    pub radio_on_time: u32,
}

/// The flood primitive. One pulse at a time, strictly bracketed by
/// `start`/`stop`.
///
/// Contracts Crystal relies on:
///
/// - `stop` returns within the slot width when `start` was invoked at
///   the absolute slot start;
/// - the initiator id reported in [`Harvest`] is the one given to
///   `start`;
/// - when [`Harvest::t_ref_updated`] is true and the pulse ran
///   [`SyncMode::WithSync`], [`Harvest::t_ref`] is the local time of the
///   initiator's transmit reference.
pub trait Flood {
    /// One-shot initialization of the primitive.
    fn init(&mut self);

    /// Begin a pulse. `frame` is the frame to transmit when this node
    /// initiates; receivers ignore it.
    fn start(&mut self, params: FloodParams, frame: &[u8]);

    /// End the pulse. A received frame, if any, is written to `frame`
    /// (its length is reported in the harvest).
    fn stop(&mut self, frame: &mut [u8]) -> Harvest;
}
