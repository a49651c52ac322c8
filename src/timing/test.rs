use super::*;
use crate::config::Config;

fn conf() -> Config {
    // inter_phase_gap 33, init_guard 33 from the default timing
    Config {
        period: 32768,
        w_s: 164,
        w_t: 164,
        w_a: 82,
        ..Config::default()
    }
}

#[test]
fn ticks_wrap() {
    let t = Ticks(u32::MAX - 4);
    assert_eq!((t + 10).0, 5);
    assert_eq!(Ticks(5).since(t), 10);
    assert_eq!(Ticks(5).diff(t), 10);
    assert_eq!(t.diff(Ticks(5)), -10);
    assert_eq!((Ticks(3) - 10).0, u32::MAX - 6);
    assert_eq!(Ticks(7).add_signed(-10).0, u32::MAX - 2);
}

#[test]
fn layout_offsets() {
    let lay = Layout::new(&conf());
    // 2 * init_guard + w_s + 2 * gap
    assert_eq!(lay.tas_start_offs, 2 * 33 + 164 + 2 * 33);
    // w_t + w_a + 2 * gap
    assert_eq!(lay.ta_duration, 164 + 82 + 2 * 33);
    assert_eq!(lay.phase_t_offs(0), lay.tas_start_offs);
    assert_eq!(lay.phase_t_offs(3), lay.tas_start_offs + 3 * lay.ta_duration);
    assert_eq!(lay.phase_a_offs(2), lay.phase_t_offs(2) + 164 + 33);
}

#[test]
fn a_capture_inverts_a_offset() {
    let lay = Layout::new(&conf());
    let t_ref = Ticks(100_000);
    for n in [0u16, 1, 5, 17] {
        let captured = t_ref + lay.phase_a_offs(n);
        assert_eq!(lay.ref_from_a_capture(captured, n), t_ref);
    }
}

#[test]
fn join_index_is_next_free_pair() {
    let lay = Layout::new(&conf());
    assert!(lay.is_before_tas(lay.tas_start_offs - 1));
    assert!(!lay.is_before_tas(lay.tas_start_offs));
    // just at the chain start there is no time left for pair 0
    assert!(lay.is_well_before_tas(lay.tas_start_offs - lay.inter_phase_gap - 1));
    assert!(!lay.is_well_before_tas(lay.tas_start_offs - lay.inter_phase_gap));

    // inside pair k, the next reachable pair is k + 1
    for k in 0..4u16 {
        let offs = lay.phase_t_offs(k) + 1;
        assert_eq!(lay.join_n_ta(offs), k + 1);
    }
}

#[test]
fn max_tas_fills_the_active_portion() {
    let c = conf();
    let lay = Layout::new(&c);
    let t = &c.timing;
    let active = c.period
        - t.time_for_app
        - t.app_pre_epoch_cb_time
        - t.init_guard
        - t.inter_phase_gap
        - 100;
    let last_start = lay.phase_t_offs(lay.max_tas - 1);
    assert!(last_start + lay.ta_duration <= active);
    assert!(lay.phase_t_offs(lay.max_tas) + lay.ta_duration > active);
}
