//! Sink-side epoch driver: emit S, run TA pairs, decide sleep orders,
//! own the authoritative epoch clock.

use super::slot::Slot;
use super::{Crystal, Phase, Step};
use crate::app::{App, Platform};
use crate::flood::{Flood, FloodParams, Harvest, SyncMode, UNKNOWN_INITIATOR};
use crate::frame::{AckHdr, Cmd, SyncHdr, A_HDR_LEN, KIND_DATA, S_HDR_LEN, T_HDR_LEN};
use crate::logging::{TaStatus, PHASE_A, PHASE_S, PHASE_T};
use crate::timing::Ticks;

impl<F: Flood, P: Platform, A: App> Crystal<F, P, A> {
    pub(super) fn sink_boot(&mut self, now: Ticks) -> Step {
        self.app.start_done(true);
        let t = &self.conf.timing;
        // + 16 of slack so the first S is never armed in the past
        self.t_ref_root = now + t.osc_stab_time + t.flood_pre_time + 16;
        self.sink_epoch_begin()
    }

    pub(super) fn sink_epoch_begin(&mut self) -> Step {
        self.begin_epoch_state();
        self.platform.radio_on();

        self.epoch = self.epoch.wrapping_add(1);

        let plds_s = self.conf.plds_s;
        self.app.pre_s(self.buf.payload_mut(S_HDR_LEN, plds_s));

        self.t_s_start = self.t_ref_root;
        self.t_s_stop = self.t_s_start + self.layout.w_s;

        // let the oscillator stabilize before touching the radio
        self.phase = Phase::SinkSArm;
        let t = &self.conf.timing;
        Step::WaitUntil(self.t_s_start - (t.flood_pre_time + 16))
    }

    pub(super) fn sink_arm_s(&mut self) -> Step {
        self.buf.set_sync_hdr(SyncHdr {
            src: self.node_id,
            epoch: self.epoch,
        });
        let start = self.exec.arm(Slot {
            t_start: self.t_s_start,
            t_stop: self.t_s_stop,
            params: FloodParams {
                initiator: self.node_id,
                frame_len: self.conf.s_total_len(),
                n_tx: self.conf.ntx_s,
                sync: SyncMode::WithSync,
            },
        });
        self.phase = Phase::SinkSRun;
        Step::WaitUntil(start)
    }

    pub(super) fn sink_after_s(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_S, &h, self.conf.ntx_s, true);
        self.es.tx_count_s = h.n_tx;
        self.es.rx_count_s = h.n_rx;

        self.app.post_s(false, &[]);
        self.buf.zero();
        self.sink_ta_begin()
    }

    fn sink_ta_begin(&mut self) -> Step {
        if self.es.sleep_order || self.n_ta >= self.layout.max_tas {
            return self.sink_epoch_close();
        }
        self.logger.begin_ta();
        self.correct_packet = false;

        let plds_t = self.conf.plds_t as usize;
        self.app.pre_t(&mut self.staging[..plds_t]);

        self.buf.set_kind(KIND_DATA);
        let lay = &self.layout;
        let t_start = self.t_ref_root - lay.short_guard + lay.phase_t_offs(self.n_ta);
        let t_stop = t_start + lay.w_t + lay.short_guard + lay.sink_end_guard;
        let start = self.exec.arm(Slot {
            t_start,
            t_stop,
            params: FloodParams {
                initiator: UNKNOWN_INITIATOR,
                frame_len: self.conf.t_total_len(),
                n_tx: self.conf.ntx_t,
                sync: SyncMode::WithoutSync,
            },
        });
        self.phase = Phase::SinkTRun;
        Step::WaitUntil(start)
    }

    pub(super) fn sink_after_t(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_T, &h, self.conf.ntx_t, false);
        self.correct_packet = false;
        self.es.rx_count_t = h.n_rx;

        if h.n_rx > 0 {
            self.es.n_empty_ts = 0;
            self.es.n_radio_reception_errors = 0;
            self.logger.scratch.recv_kind = self.buf.kind();
            self.logger.scratch.recv_length = h.payload_len;
            self.correct_packet =
                h.payload_len == self.conf.t_total_len() && self.buf.kind() == KIND_DATA;
            self.logger.scratch.status = if self.correct_packet {
                TaStatus::RecvOk
            } else {
                TaStatus::BadData
            };
        } else if self.conf.x > 0 && h.status.reception_error {
            self.es.n_radio_reception_errors += 1;
            self.logger.scratch.status_reg = h.status.raw;
        } else {
            // just silence
            self.es.n_radio_reception_errors = 0;
            self.es.n_empty_ts += 1;
            self.logger.scratch.status = TaStatus::Silence;
        }

        let plds_t = self.conf.plds_t;
        let plds_a = self.conf.plds_a as usize;
        self.app.between_ta(
            self.correct_packet,
            self.buf.payload(T_HDR_LEN, plds_t),
            &mut self.staging[..plds_a],
        );
        let app_log = self.app.ta_log();
        self.logger.commit_ta(
            false,
            self.n_ta,
            self.node_id,
            app_log,
            self.es.rx_count_t,
            self.es.rx_count_a,
        );
        self.buf.zero();

        self.es.sleep_order = self.epoch >= self.conf.n_full_epochs
            && (self.n_ta >= self.layout.max_tas.saturating_sub(1)
                || self.es.n_empty_ts >= self.dynamic_nempty(self.n_ta)
                || (self.conf.x > 0
                    && self.es.n_radio_reception_errors >= self.conf.x as u16));

        let cmd = if self.es.sleep_order {
            Cmd::Sleep
        } else {
            Cmd::Awake
        };
        self.buf
            .set_ack_hdr(AckHdr::new(self.epoch, self.n_ta as u8, cmd));
        self.buf
            .payload_mut(A_HDR_LEN, plds_a as u8)
            .copy_from_slice(&self.staging[..plds_a]);

        let t_start = self.t_ref_root + self.layout.phase_a_offs(self.n_ta);
        let t_stop = t_start + self.layout.w_a;
        let start = self.exec.arm(Slot {
            t_start,
            t_stop,
            params: FloodParams {
                initiator: self.node_id,
                frame_len: self.conf.a_total_len(),
                n_tx: self.conf.ntx_a,
                sync: if self.conf.sync_acks {
                    SyncMode::WithSync
                } else {
                    SyncMode::WithoutSync
                },
            },
        });
        self.phase = Phase::SinkARun;
        Step::WaitUntil(start)
    }

    pub(super) fn sink_after_a(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_A, &h, self.conf.ntx_a, true);

        let plds_a = self.conf.plds_a;
        self.app.post_a(false, self.buf.payload(A_HDR_LEN, plds_a));
        self.buf.zero();

        self.n_ta += 1;
        self.sink_ta_begin()
    }

    /// Empty-T threshold for the sleep decision. Pair 1 closes after a
    /// single empty slot: traffic that exists shows up in pair 0 or,
    /// clipped by its ack, in pair 1.
    fn dynamic_nempty(&self, n_ta: u16) -> u16 {
        if n_ta == 1 {
            1
        } else {
            self.conf.r as u16
        }
    }

    fn sink_epoch_close(&mut self) -> Step {
        self.platform.radio_off();

        self.t_ref_root += self.conf.period;
        let t = &self.conf.timing;
        self.t_wakeup = self.t_ref_root - (t.osc_stab_time + t.flood_pre_time + t.inter_phase_gap);

        self.app.epoch_end();
        self.phase = Phase::SinkPreEpoch;
        Step::WaitUntil(self.t_wakeup - t.app_pre_epoch_cb_time)
    }

    pub(super) fn sink_pre_epoch(&mut self) -> Step {
        self.app.pre_epoch();
        self.phase = Phase::SinkEpochBegin;
        Step::WaitUntil(self.t_wakeup)
    }
}
