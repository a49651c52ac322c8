use super::*;
use crate::config::Timing;

const PERIOD: u32 = 32768;

fn synced_once(at: Ticks) -> SyncState {
    let mut s = SyncState::default();
    s.s_capture(at, PERIOD);
    s
}

#[test]
fn two_exact_captures_estimate_zero_skew() {
    let mut s = synced_once(Ticks(1000));
    assert!(!s.skew_estimated);

    s.s_capture(Ticks(1000 + PERIOD), PERIOD);
    assert!(s.skew_estimated);
    assert_eq!(s.period_skew, 0);
    assert_eq!(s.sync_missed, 0);
}

#[test]
fn drift_over_missed_epochs_averages_out() {
    // a capture, then k - 1 silent epochs, then a capture drifted by d:
    // the estimate is d / k
    let (k, d) = (4u32, 48i32);
    let mut s = synced_once(Ticks(1000));
    for _ in 0..k - 1 {
        s.t_ref_estimated = s.t_ref_skewed + PERIOD;
        s.s_missed(PERIOD);
    }
    assert_eq!(s.sync_missed, k as u16 - 1);

    let at = Ticks(1000 + k * PERIOD).add_signed(d);
    s.s_capture(at, PERIOD);
    assert_eq!(s.period_skew, d / k as i32);
    assert!(s.skew_estimated);
}

#[test]
fn negative_drift_is_signed() {
    let mut s = synced_once(Ticks(50_000));
    s.s_capture(Ticks(50_000 + PERIOD - 7), PERIOD);
    assert_eq!(s.period_skew, -7);
}

#[test]
fn miss_extrapolates_the_estimate() {
    let mut s = synced_once(Ticks(1000));
    s.t_ref_estimated = Ticks(1000 + PERIOD);
    s.s_missed(PERIOD);
    assert_eq!(s.sync_missed, 1);
    assert_eq!(s.t_ref_corrected, Ticks(1000 + PERIOD));
    assert_eq!(s.t_ref_corrected_s, Ticks(1000 + PERIOD));
    assert_eq!(s.t_ref_skewed, Ticks(1000 + PERIOD));
}

#[test]
fn ack_outlier_rejected_when_synced_this_epoch() {
    let mut s = synced_once(Ticks(10_000));
    // synchronized via S this epoch: a 61-tick deviation is an outlier
    assert!(!s.ack_ref_ok(Ticks(10_000 + 61), 1));
    assert_eq!(s.log_ack_skew_err, 61);
    assert_eq!(s.t_ref_corrected, Ticks(10_000));

    assert!(!s.ack_ref_ok(Ticks(10_000 - 80), 1));
    assert_eq!(s.log_ack_skew_err, -80);
}

#[test]
fn ack_small_skew_accepted() {
    let mut s = synced_once(Ticks(10_000));
    assert!(s.ack_ref_ok(Ticks(10_000 + 59), 1));
    s.ack_capture(Ticks(10_000 + 59));
    assert_eq!(s.t_ref_corrected, Ticks(10_059));
    assert_eq!(s.synced_with_ack, 1);
    assert_eq!(s.n_noack_epochs, 0);
}

#[test]
fn ack_large_skew_accepted_when_nothing_else_synced() {
    let mut s = synced_once(Ticks(10_000));
    s.t_ref_estimated = Ticks(10_000 + PERIOD);
    s.s_missed(PERIOD);
    // missed the S and no prior ack this epoch: trust the ack
    assert!(s.ack_ref_ok(Ticks(10_000 + PERIOD + 500), 1));
}

#[test]
fn ack_with_absurd_hop_count_rejected() {
    let mut s = synced_once(Ticks(10_000));
    assert!(!s.ack_ref_ok(Ticks(10_000), MAX_CORRECT_HOPS + 1));
}

#[test]
fn tx_suppressed_when_either_path_goes_silent() {
    let mut s = SyncState::default();
    assert!(s.tx_allowed());

    s.sync_missed = N_SILENT_EPOCHS_TO_STOP_SENDING;
    assert!(!s.tx_allowed());

    s.sync_missed = 0;
    s.n_noack_epochs = N_SILENT_EPOCHS_TO_STOP_SENDING;
    assert!(!s.tx_allowed());
}

#[test]
fn reset_after_prolonged_silence_on_both_paths() {
    let mut s = SyncState::default();
    s.sync_missed = N_SILENT_EPOCHS_TO_RESET + 1;
    assert!(!s.should_reset());
    s.n_noack_epochs = N_SILENT_EPOCHS_TO_RESET + 1;
    assert!(s.should_reset());
}

#[test]
fn s_guard_narrows_once_skew_is_estimated() {
    let t = Timing::default();
    let mut s = synced_once(Ticks(0));
    assert_eq!(s.s_guard(&t), t.init_guard);

    s.s_capture(Ticks(PERIOD), PERIOD);
    assert_eq!(s.s_guard(&t), t.long_guard);

    s.sync_missed = N_MISSED_FOR_INIT_GUARD;
    assert_eq!(s.s_guard(&t), t.init_guard);
}

#[test]
fn ta_guard_widens_only_without_any_sync_this_epoch() {
    // tell the two guards apart; platforms tune them independently
    let t = Timing {
        short_guard: 5,
        short_guard_nosync: 9,
        ..Timing::default()
    };
    let mut s = SyncState::default();
    s.sync_missed = 1;
    assert_eq!(s.ta_rx_guard(&t), t.short_guard_nosync);
    s.synced_with_ack = 1;
    assert_eq!(s.ta_rx_guard(&t), t.short_guard);
}
