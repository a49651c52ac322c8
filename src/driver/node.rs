//! Non-sink epoch driver: scan-and-join bootstrap, S capture or
//! extrapolation, the transmit/listen TA chain, and sleep/awake
//! obedience.

use log::warn;

use super::slot::Slot;
use super::{Crystal, Phase, Step};
use crate::app::{App, Platform};
use crate::flood::{
    Flood, FloodParams, Harvest, SyncMode, UNKNOWN_INITIATOR, UNKNOWN_N_TX, UNKNOWN_PAYLOAD_LEN,
};
use crate::frame::{Cmd, A_HDR_LEN, KIND_ACK, KIND_DATA, KIND_SYNC, S_HDR_LEN, T_HDR_LEN};
use crate::logging::{TaStatus, PHASE_A, PHASE_S, PHASE_T};
use crate::sync::MAX_CORRECT_HOPS;
use crate::timing::Ticks;

impl<F: Flood, P: Platform, A: App> Crystal<F, P, A> {
    pub(super) fn node_boot(&mut self, now: Ticks) -> Step {
        self.scan_elapsed = 0;
        self.scan_arm(now)
    }

    fn scan_arm(&mut self, now: Ticks) -> Step {
        let t = &self.conf.timing;
        // + 6 of slack between the fire and the flood start
        let t_start = now + t.flood_pre_time + 6;
        let t_stop = t_start + t.scan_slot_duration;

        self.buf.set_kind(0);
        let start = self.exec.arm(Slot {
            t_start,
            t_stop,
            params: FloodParams {
                initiator: UNKNOWN_INITIATOR,
                frame_len: UNKNOWN_PAYLOAD_LEN,
                n_tx: UNKNOWN_N_TX,
                sync: SyncMode::WithSync,
            },
        });
        self.phase = Phase::ScanRun;
        Step::WaitUntil(start)
    }

    pub(super) fn scan_harvest(&mut self, h: Harvest, now: Ticks) -> Step {
        if h.n_rx > 0 {
            let kind = self.buf.kind();
            self.es.recv_kind_s = kind;
            self.es.recv_len_s = h.payload_len;

            if kind == KIND_SYNC && h.payload_len == self.conf.s_total_len() {
                let hdr = self.buf.sync_hdr();
                self.sink_id = h.initiator;
                self.epoch = hdr.epoch;
                self.n_ta = 0;
                if h.t_ref_updated {
                    self.sync.t_ref_corrected = h.t_ref;
                    return self.node_join(now);
                }
                return self.scan_arm(now);
            } else if kind == KIND_ACK && h.payload_len == self.conf.a_total_len() {
                let hdr = self.buf.ack_hdr();
                self.epoch = hdr.epoch;
                self.n_ta = hdr.n_ta as u16;
                if h.t_ref_updated {
                    self.sync.t_ref_corrected =
                        self.layout.ref_from_a_capture(h.t_ref, self.n_ta);
                    return self.node_join(now);
                }
                return self.scan_arm(now);
            } else if kind == KIND_DATA {
                // keep listening on the same channel for the ack that
                // follows; a non-synchronizing flood exits right away
                return self.scan_arm(now);
            }
        }

        self.scan_elapsed += self.conf.timing.scan_slot_duration;
        // the config maximums keep this product inside u32
        if self.scan_elapsed > self.conf.period * self.conf.scan_duration as u32 {
            warn!("scan budget exhausted, failed to join");
            self.app.start_done(false);
            self.phase = Phase::Idle;
            return Step::Stopped;
        }
        self.scan_arm(now)
    }

    /// The scan adopted an epoch reference; figure out where in the
    /// epoch we are and enter the loop, possibly mid-chain.
    fn node_join(&mut self, now: Ticks) -> Step {
        self.app.start_done(true);
        self.buf.zero();

        let lay = self.layout;
        let t = self.conf.timing;
        // + 20 of slack against arming the first slot in the past
        let mut offs = now.since(self.sync.t_ref_corrected - lay.ref_shift) + 20;

        if offs + t.init_guard + t.osc_stab_time + t.flood_pre_time > self.conf.period {
            // so late that the next epoch has already started
            self.epoch = self.epoch.wrapping_add(1);
            self.sync.t_ref_corrected += self.conf.period;
            offs = offs.saturating_sub(self.conf.period);
        }

        // either well before the next S, or inside this epoch's chain
        if lay.is_before_tas(offs) {
            self.skip_s = true;
            self.starting_n_ta = if lay.is_well_before_tas(offs) { 0 } else { 1 };
        } else {
            self.starting_n_ta = lay.join_n_ta(offs);
            if self.starting_n_ta < lay.max_tas {
                self.skip_s = true;
            } else {
                // past the chain; capture the next S instead
                self.starting_n_ta = 0;
                self.skip_s = false;
            }
        }

        // the adopted reference points at the running epoch
        self.sync.t_ref_corrected_s = self.sync.t_ref_corrected;
        self.sync.t_ref_estimated = self.sync.t_ref_corrected + self.conf.period;
        self.sync.t_ref_skewed = self.sync.t_ref_estimated;
        self.t_s_start = self.sync.t_ref_estimated - lay.ref_shift - t.init_guard;
        self.t_s_stop = self.t_s_start + lay.w_s + 2 * t.init_guard;

        self.node_epoch_begin()
    }

    pub(super) fn node_epoch_begin(&mut self) -> Step {
        self.begin_epoch_state();

        if !self.skip_s {
            self.platform.radio_on();
            self.epoch = self.epoch.wrapping_add(1);
            self.starting_n_ta = 0;

            let plds_s = self.conf.plds_s as usize;
            self.app.pre_s(&mut self.staging[..plds_s]);

            self.phase = Phase::NodeSArm;
            let t = &self.conf.timing;
            return Step::WaitUntil(self.t_s_start - (t.flood_pre_time + 16));
        }
        self.node_ta_chain()
    }

    pub(super) fn node_arm_s(&mut self) -> Step {
        self.buf.set_kind(KIND_SYNC);
        let start = self.exec.arm(Slot {
            t_start: self.t_s_start,
            t_stop: self.t_s_stop,
            params: FloodParams {
                initiator: self.sink_id,
                frame_len: self.conf.s_total_len(),
                n_tx: self.conf.ntx_s,
                sync: SyncMode::WithSync,
            },
        });
        self.phase = Phase::NodeSRun;
        Step::WaitUntil(start)
    }

    pub(super) fn node_after_s(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_S, &h, self.conf.ntx_s, false);
        self.es.rx_count_s = h.n_rx;
        self.es.tx_count_s = h.n_tx;
        self.correct_packet = false;

        if h.n_rx > 0 {
            self.es.recv_len_s = h.payload_len;
            self.es.recv_kind_s = self.buf.kind();
            self.es.recv_src_s = self.buf.sync_hdr().src;
            self.correct_packet = self.es.recv_kind_s == KIND_SYNC
                && self.es.recv_len_s == self.conf.s_total_len();
            if self.correct_packet {
                self.epoch = self.buf.sync_hdr().epoch;
                self.hopcount = h.relay_cnt_first_rx as u16;
            }
        }

        if h.t_ref_updated && self.correct_packet && h.relay_cnt_first_rx <= MAX_CORRECT_HOPS {
            self.sync.s_capture(h.t_ref, self.conf.period);
        } else {
            self.sync.s_missed(self.conf.period);
        }

        let plds_s = self.conf.plds_s;
        self.app
            .post_s(self.correct_packet, self.buf.payload(S_HDR_LEN, plds_s));
        self.buf.zero();

        self.node_ta_chain()
    }

    fn node_ta_chain(&mut self) -> Step {
        self.skip_s = false;
        self.n_ta = self.starting_n_ta;
        self.node_ta_begin()
    }

    fn node_ta_begin(&mut self) -> Step {
        self.logger.begin_ta();
        self.correct_packet = false;

        let plds_t = self.conf.plds_t as usize;
        self.have_packet = self.app.pre_t(&mut self.staging[..plds_t]);
        self.i_tx = self.have_packet && self.sync.tx_allowed();

        let guard = if self.i_tx {
            self.es.n_ta_tx += 1;
            self.buf
                .payload_mut(T_HDR_LEN, self.conf.plds_t)
                .copy_from_slice(&self.staging[..plds_t]);
            // no guard when initiating
            0
        } else {
            self.sync.ta_rx_guard(&self.conf.timing)
        };

        self.buf.set_kind(KIND_DATA);
        let lay = &self.layout;
        let t_start =
            self.sync.t_ref_corrected + lay.phase_t_offs(self.n_ta) - lay.ref_shift - guard;
        let t_stop = t_start + lay.w_t + guard;
        let start = self.exec.arm(Slot {
            t_start,
            t_stop,
            params: FloodParams {
                initiator: if self.i_tx {
                    self.node_id
                } else {
                    UNKNOWN_INITIATOR
                },
                frame_len: self.conf.t_total_len(),
                n_tx: self.conf.ntx_t,
                sync: SyncMode::WithoutSync,
            },
        });
        self.phase = Phase::NodeTRun;
        Step::WaitUntil(start)
    }

    pub(super) fn node_after_t(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_T, &h, self.conf.ntx_t, self.i_tx);
        self.es.rx_count_t = h.n_rx;

        if !self.i_tx {
            if h.n_rx > 0 {
                self.logger.scratch.recv_kind = self.buf.kind();
                self.logger.scratch.recv_length = h.payload_len;
                self.correct_packet =
                    h.payload_len == self.conf.t_total_len() && self.buf.kind() == KIND_DATA;
                self.logger.scratch.status = if self.correct_packet {
                    TaStatus::RecvOk
                } else {
                    TaStatus::BadData
                };
                self.es.n_empty_ts = 0;
            } else if h.status.corrupted {
                self.logger.scratch.status = TaStatus::BadCrc;
                // n_empty_ts kept as is: another chance, but not too many
            } else {
                self.logger.scratch.status = TaStatus::Silence;
                self.es.n_empty_ts += 1;
            }
        }

        let plds_t = self.conf.plds_t;
        let plds_a = self.conf.plds_a as usize;
        self.app.between_ta(
            self.correct_packet,
            self.buf.payload(T_HDR_LEN, plds_t),
            &mut self.staging[..plds_a],
        );
        self.buf.zero();

        // A slot
        self.correct_packet = false;
        let guard = self.sync.ta_rx_guard(&self.conf.timing);
        let lay = &self.layout;
        let t_start =
            self.sync.t_ref_corrected - guard + lay.phase_a_offs(self.n_ta) - lay.ref_shift;
        let t_stop = t_start + lay.w_a + guard;

        self.buf.set_kind(KIND_ACK);
        let start = self.exec.arm(Slot {
            t_start,
            t_stop,
            params: FloodParams {
                initiator: self.sink_id,
                frame_len: self.conf.a_total_len(),
                n_tx: self.conf.ntx_a,
                sync: if self.conf.sync_acks {
                    SyncMode::WithSync
                } else {
                    SyncMode::WithoutSync
                },
            },
        });
        self.phase = Phase::NodeARun;
        Step::WaitUntil(start)
    }

    pub(super) fn node_after_a(&mut self, h: Harvest) -> Step {
        self.stats.update(PHASE_A, &h, self.conf.ntx_a, false);
        self.es.rx_count_a = h.n_rx;

        if h.n_rx > 0 {
            let kind = self.buf.kind();
            let hdr = self.buf.ack_hdr();
            let len_ok = h.payload_len == self.conf.a_total_len();

            if len_ok && kind == KIND_ACK && hdr.cmd().is_some() {
                self.correct_packet = true;
                self.es.n_noacks = 0;
                self.es.n_bad_acks = 0;
                self.es.n_all_acks += 1;
                // the ack can reveal that we slept through whole epochs
                self.epoch = hdr.epoch;

                if self.conf.sync_acks && h.t_ref_updated && hdr.n_ta as u16 == self.n_ta {
                    // corrupted n_ta values and bogus reference times do
                    // slip through, hence the gates above and the skew
                    // filter below
                    let cand = self.layout.ref_from_a_capture(h.t_ref, self.n_ta);
                    if self.sync.ack_ref_ok(cand, h.relay_cnt_first_rx) {
                        self.sync.ack_capture(cand);
                    }
                }

                if hdr.cmd() == Some(Cmd::Sleep) {
                    self.es.sleep_order = true;
                }
            } else {
                // received something that is not a usable ack
                self.es.n_bad_acks += 1;
            }

            if kind != KIND_ACK {
                self.es.n_badtype_a += 1;
            }
            if h.payload_len != self.conf.a_total_len() {
                self.es.n_badlen_a += 1;
            }
            self.es.n_radio_reception_errors = 0;
        } else {
            if h.status.corrupted {
                self.es.n_badcrc_a += 1;
            }
            if self.conf.xa == 0 {
                self.es.n_noacks += 1;
            } else if h.status.reception_error {
                self.es.n_radio_reception_errors += 1;
                if self.es.n_radio_reception_errors > self.conf.xa as u16 {
                    self.es.n_noacks += 1;
                }
            } else {
                self.es.n_noacks += 1;
                self.es.n_radio_reception_errors = 0;
            }
        }

        let plds_a = self.conf.plds_a;
        self.app
            .post_a(self.correct_packet, self.buf.payload(A_HDR_LEN, plds_a));
        let app_log = self.app.ta_log();
        self.logger.commit_ta(
            self.i_tx,
            self.n_ta,
            self.node_id,
            app_log,
            self.es.rx_count_t,
            self.es.rx_count_a,
        );
        self.buf.zero();

        self.n_ta += 1;

        let terminate = self.es.sleep_order
            || self.n_ta >= self.layout.max_tas
            || (self.epoch >= self.conf.n_full_epochs
                && ((self.have_packet && self.es.n_noacks >= self.conf.z as u16)
                    || (!self.have_packet
                        && self.es.n_noacks >= self.conf.y as u16
                        && self.es.n_empty_ts >= self.conf.y as u16)));
        if terminate {
            self.node_epoch_close()
        } else {
            self.node_ta_begin()
        }
    }

    fn node_epoch_close(&mut self) -> Step {
        if self.sync.synced_with_ack == 0 {
            self.sync.n_noack_epochs += 1;
        }
        self.platform.radio_off();

        let s_guard = self.sync.s_guard(&self.conf.timing);
        self.sync.t_ref_estimated =
            (self.sync.t_ref_corrected_s + self.conf.period).add_signed(self.sync.period_skew);
        self.t_s_start = self.sync.t_ref_estimated - self.layout.ref_shift - s_guard;
        self.t_s_stop = self.t_s_start + self.layout.w_s + 2 * s_guard;

        let t = &self.conf.timing;
        self.t_wakeup = self.t_s_start - (t.osc_stab_time + t.flood_pre_time + t.inter_phase_gap);

        self.app.epoch_end();
        self.phase = Phase::NodePreEpoch;
        Step::WaitUntil(self.t_wakeup - t.app_pre_epoch_cb_time)
    }

    pub(super) fn node_pre_epoch(&mut self) -> Step {
        self.app.pre_epoch();
        self.phase = Phase::NodeEpochGate;
        Step::WaitUntil(self.t_wakeup)
    }

    pub(super) fn node_epoch_gate(&mut self) -> Step {
        if self.sync.should_reset() {
            warn!("out of sync for too long, requesting system reset");
            self.platform.system_reset();
            self.phase = Phase::Idle;
            return Step::Stopped;
        }
        self.node_epoch_begin()
    }
}
