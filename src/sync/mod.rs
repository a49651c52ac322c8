#[cfg(test)]
mod test;

use crate::config::Timing;
use crate::timing::{Ticks, N_MISSED_FOR_INIT_GUARD};

// Reference captures reported with an implausible hop count are
// discarded; they come from rare corrupted relay counters.
pub(crate) const MAX_CORRECT_HOPS: u8 = 30;

// An ACK capture deviating more than this from the current reference is
// an outlier unless nothing else synchronized us this epoch.
const ACK_SKEW_LIMIT: i32 = 60;

pub(crate) const N_SILENT_EPOCHS_TO_RESET: u16 = 100;
pub(crate) const N_SILENT_EPOCHS_TO_STOP_SENDING: u16 = 3;

/// Network-time state of a non-sink node, carried across epochs.
///
/// `t_ref_corrected` is the working epoch reference: the S capture when
/// one was accepted, else an accepted A capture, else the extrapolated
/// estimate. `t_ref_skewed` tracks the raw S-capture timeline used by
/// the skew estimator, advancing by exactly one nominal `period` per
/// missed epoch.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct SyncState {
    pub t_ref_estimated: Ticks,
    pub t_ref_corrected_s: Ticks,
    pub t_ref_corrected: Ticks,
    pub t_ref_skewed: Ticks,

    /// Consecutive epochs without an accepted S capture.
    pub sync_missed: u16,
    /// Accepted A captures in the current epoch.
    pub synced_with_ack: u16,
    /// Consecutive epochs without any accepted A capture.
    pub n_noack_epochs: u16,

    pub skew_estimated: bool,
    /// Additive clock drift per `period`, in ticks.
    pub period_skew: i32,

    /// Last rejected ACK reference deviation, for the epoch log.
    pub log_ack_skew_err: i32,

    ever_synced_with_s: bool,
}

impl SyncState {
    pub fn reset(&mut self) {
        *self = SyncState::default();
    }

    pub fn begin_epoch(&mut self) {
        self.synced_with_ack = 0;
        self.log_ack_skew_err = 0;
    }

    /// An S flood delivered a valid reference capture.
    pub fn s_capture(&mut self, t_ref: Ticks, period: u32) {
        self.t_ref_corrected_s = t_ref;
        self.t_ref_corrected = t_ref;

        if self.ever_synced_with_s {
            let drift = t_ref.diff(self.t_ref_skewed + period);
            self.period_skew = drift / (self.sync_missed as i32 + 1);
            self.skew_estimated = true;
        }
        self.t_ref_skewed = t_ref;
        self.ever_synced_with_s = true;
        self.sync_missed = 0;
    }

    /// The S slot passed without a usable capture; extrapolate.
    pub fn s_missed(&mut self, period: u32) {
        self.sync_missed += 1;
        self.t_ref_skewed += period;
        self.t_ref_corrected = self.t_ref_estimated;
        self.t_ref_corrected_s = self.t_ref_estimated;
    }

    /// Outlier gate for a reference candidate recovered from an ACK.
    ///
    /// A large deviation is accepted only when nothing synchronized the
    /// node in the current epoch, in which case the old reference is
    /// the suspect one; otherwise it is rejected and recorded.
    pub fn ack_ref_ok(&mut self, cand: Ticks, relay_cnt_first_rx: u8) -> bool {
        if relay_cnt_first_rx > MAX_CORRECT_HOPS {
            return false;
        }
        let skew = cand.diff(self.t_ref_corrected);
        if skew > -ACK_SKEW_LIMIT && skew < ACK_SKEW_LIMIT {
            return true;
        }
        if self.sync_missed > 0 && self.synced_with_ack == 0 {
            return true;
        }
        self.log_ack_skew_err = skew;
        false
    }

    pub fn ack_capture(&mut self, cand: Ticks) {
        self.t_ref_corrected = cand;
        self.synced_with_ack += 1;
        // Resetting right here re-enables transmissions the ack path
        // had suppressed, from the next TA on.
        self.n_noack_epochs = 0;
    }

    /// Whether this node may still initiate T floods. Transmissions
    /// are suppressed as soon as either the S path or the ack path has
    /// been silent for too many epochs.
    pub fn tx_allowed(&self) -> bool {
        self.sync_missed < N_SILENT_EPOCHS_TO_STOP_SENDING
            && self.n_noack_epochs < N_SILENT_EPOCHS_TO_STOP_SENDING
    }

    /// Prolonged-silence rule: both the S and the ack paths have been
    /// dead for longer than the reset threshold.
    pub fn should_reset(&self) -> bool {
        self.sync_missed > N_SILENT_EPOCHS_TO_RESET
            && self.n_noack_epochs > N_SILENT_EPOCHS_TO_RESET
    }

    /// Guard for the next S slot.
    pub fn s_guard(&self, t: &Timing) -> u32 {
        if !self.skew_estimated || self.sync_missed >= N_MISSED_FOR_INIT_GUARD {
            t.init_guard
        } else {
            t.long_guard
        }
    }

    /// Receive guard for T and A slots.
    pub fn ta_rx_guard(&self, t: &Timing) -> u32 {
        if self.sync_missed > 0 && self.synced_with_ack == 0 {
            t.short_guard_nosync
        } else {
            t.short_guard
        }
    }
}
