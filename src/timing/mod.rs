#[cfg(test)]
mod test;

use core::ops::{Add, AddAssign, Sub};

use crate::config::Config;

/// An absolute instant of the platform's high-precision radio timer.
///
/// The counter is 32 bits wide and wraps; all arithmetic on [`Ticks`] is
/// wrapping by construction. Durations are plain `u32` tick counts, and
/// clock-skew corrections are signed tick counts applied with
/// [`add_signed`][Ticks::add_signed].
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticks(pub u32);

impl Ticks {
    /// Ticks elapsed from `earlier` to `self`, modulo the timer width.
    pub fn since(self, earlier: Ticks) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Signed distance from `other` to `self`.
    ///
    /// Only meaningful when the two instants are within half the timer
    /// range of each other, which holds for everything inside an epoch.
    pub fn diff(self, other: Ticks) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }

    pub fn add_signed(self, d: i32) -> Ticks {
        Ticks(self.0.wrapping_add(d as u32))
    }
}

impl Add<u32> for Ticks {
    type Output = Ticks;

    fn add(self, rhs: u32) -> Ticks {
        Ticks(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for Ticks {
    type Output = Ticks;

    fn sub(self, rhs: u32) -> Ticks {
        Ticks(self.0.wrapping_sub(rhs))
    }
}

impl AddAssign<u32> for Ticks {
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

// After this many consecutive missed S floods the next-epoch S window is
// re-opened to the wide startup guard.
pub(crate) const N_MISSED_FOR_INIT_GUARD: u16 = 3;

/// Epoch layout derived from a [`Config`], fixed for the whole run.
///
/// Every slot boundary in an epoch is an offset from the epoch reference
/// time `t_ref` (the instant the sink emits its S flood). The S window
/// is budgeted at its worst case (wide startup guards) so that the TA
/// chain never moves, whatever guard the S slot actually used.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Layout {
    pub w_s: u32,
    pub w_t: u32,
    pub w_a: u32,
    pub inter_phase_gap: u32,
    pub init_guard: u32,
    pub long_guard: u32,
    pub short_guard: u32,
    pub short_guard_nosync: u32,
    pub sink_end_guard: u32,
    pub ref_shift: u32,
    pub tas_start_offs: u32,
    pub ta_duration: u32,
    pub max_tas: u16,
}

impl Layout {
    pub fn new(conf: &Config) -> Layout {
        let t = &conf.timing;
        let w_s = conf.w_s as u32;
        let w_t = conf.w_t as u32;
        let w_a = conf.w_a as u32;

        // It is important to budget the maximum possible S phase duration
        // before the first TA.
        let phase_s_end = 2 * t.init_guard + w_s + t.inter_phase_gap;
        let tas_start_offs = phase_s_end + t.inter_phase_gap;
        let ta_duration = w_t + w_a + 2 * t.inter_phase_gap;

        let max_active = conf
            .period
            .saturating_sub(t.time_for_app)
            .saturating_sub(t.app_pre_epoch_cb_time)
            .saturating_sub(t.init_guard)
            .saturating_sub(t.inter_phase_gap)
            .saturating_sub(100);
        let max_tas = (max_active.saturating_sub(tas_start_offs) / ta_duration) as u16;

        Layout {
            w_s,
            w_t,
            w_a,
            inter_phase_gap: t.inter_phase_gap,
            init_guard: t.init_guard,
            long_guard: t.long_guard,
            short_guard: t.short_guard,
            short_guard_nosync: t.short_guard_nosync,
            sink_end_guard: t.sink_end_guard,
            ref_shift: t.ref_shift,
            tas_start_offs,
            ta_duration,
            max_tas,
        }
    }

    /// Offset of the T slot of TA pair `n` from the epoch reference.
    pub fn phase_t_offs(&self, n: u16) -> u32 {
        self.tas_start_offs + n as u32 * self.ta_duration
    }

    /// Offset of the A slot of TA pair `n` from the epoch reference.
    pub fn phase_a_offs(&self, n: u16) -> u32 {
        self.phase_t_offs(n) + self.w_t + self.inter_phase_gap
    }

    /// Epoch reference reconstructed from the capture of the A flood of
    /// TA pair `n`.
    pub fn ref_from_a_capture(&self, t_ref_a: Ticks, n: u16) -> Ticks {
        t_ref_a - self.phase_a_offs(n)
    }

    /// True if `offs` from the epoch reference lies before the TA chain.
    pub fn is_before_tas(&self, offs: u32) -> bool {
        offs < self.tas_start_offs
    }

    /// True if there is still time to schedule TA 0 from `offs`.
    pub fn is_well_before_tas(&self, offs: u32) -> bool {
        offs + self.inter_phase_gap < self.phase_t_offs(0)
    }

    /// TA index a mid-epoch joiner can still catch from offset `offs`.
    ///
    /// Valid only when `is_before_tas(offs)` does not hold.
    pub fn join_n_ta(&self, offs: u32) -> u16 {
        ((offs + self.inter_phase_gap - self.tas_start_offs) / self.ta_duration) as u16 + 1
    }
}
