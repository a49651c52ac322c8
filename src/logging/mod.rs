//! Per-epoch diagnostic records.
//!
//! The driver fills a bounded record per TA pair and a handful of
//! per-phase statistics while the epoch runs; nothing is formatted or
//! emitted until [`print_epoch_logs`][crate::driver::Crystal::print_epoch_logs]
//! is called from process context, outside the time-critical schedule.

use arrayvec::ArrayVec;
use log::{debug, info};

use crate::app::AppLog;
use crate::flood::Harvest;
use crate::frame::{Addr, Epoch};

/// Record capacity per print interval; further TA pairs go unrecorded.
pub const MAX_LOG_TAS: usize = 50;

/// Outcome of one TA pair, as seen by this node.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum TaStatus {
    #[default]
    RecvOk,
    BadData,
    BadCrc,
    HighNoise,
    Silence,
    Tx,
}

/// One logged TA pair.
#[derive(Clone, Copy, Debug)]
pub struct TaRecord {
    pub n_ta: u16,
    pub status: TaStatus,
    pub src: Addr,
    pub seqn: u16,
    /// Kind tag of the received frame, zero if nothing was received.
    pub kind: u8,
    pub t_rx_count: u8,
    pub a_rx_count: u8,
    pub length: u8,
    pub acked: bool,
    /// Raw radio status word; nonzero only when a reception error was
    /// detected in the pair.
    pub status_reg: u32,
}

/// Scratch for the TA record being assembled, reset at each TA begin.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct TaScratch {
    pub recv_kind: u8,
    pub recv_length: u8,
    pub status: TaStatus,
    pub status_reg: u32,
}

pub(crate) const PHASE_S: usize = 0;
pub(crate) const PHASE_T: usize = 1;
pub(crate) const PHASE_A: usize = 2;

/// Per-phase flood statistics for the current epoch.
///
/// A flood counts as full when it reached its configured number of
/// transmissions (one less for the initiator, which does not relay its
/// own first reception).
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct PhaseStats {
    /// Accumulated radio-on time.
    pub ton: [u32; 3],
    /// Radio-on time of full floods only.
    pub tf: [u32; 3],
    /// Number of full floods.
    pub n_short: [u16; 3],
}

impl PhaseStats {
    pub fn update(&mut self, phase: usize, harvest: &Harvest, n_tx: u8, initiated: bool) {
        self.ton[phase] += harvest.radio_on_time;
        let full_at = if initiated { n_tx.saturating_sub(1) } else { n_tx };
        if harvest.n_tx >= full_at {
            self.tf[phase] += harvest.radio_on_time;
            self.n_short[phase] += 1;
        }
    }
}

pub(crate) struct EpochLogger {
    pub scratch: TaScratch,
    records: ArrayVec<TaRecord, MAX_LOG_TAS>,
}

impl EpochLogger {
    pub fn new() -> EpochLogger {
        EpochLogger {
            scratch: TaScratch::default(),
            records: ArrayVec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.scratch = TaScratch::default();
        self.records.clear();
    }

    pub fn begin_ta(&mut self) {
        self.scratch = TaScratch::default();
    }

    pub fn commit_ta(
        &mut self,
        tx: bool,
        n_ta: u16,
        node_id: Addr,
        app: AppLog,
        t_rx_count: u8,
        a_rx_count: u8,
    ) {
        let rec = TaRecord {
            n_ta,
            status: if tx { TaStatus::Tx } else { self.scratch.status },
            src: if tx { node_id } else { app.recv_src },
            seqn: if tx { app.send_seqn } else { app.recv_seqn },
            kind: self.scratch.recv_kind,
            t_rx_count,
            a_rx_count,
            length: self.scratch.recv_length,
            acked: app.acked,
            status_reg: self.scratch.status_reg,
        };
        let _ = self.records.try_push(rec);
    }

    pub fn records(&self) -> &[TaRecord] {
        &self.records
    }
}

/// Everything the epoch summary lines carry, snapshotted by the driver.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct EpochSummary {
    pub is_sink: bool,
    pub epoch: Epoch,
    pub n_ta: u16,
    pub n_ta_tx: u16,
    pub n_all_acks: u16,
    pub synced_with_ack: u16,
    pub sync_missed: u16,
    pub period_skew: i32,
    pub hops: u16,
    pub recv_src_s: Addr,
    pub recv_kind_s: u8,
    pub recv_len_s: u8,
    pub n_bad_acks: u16,
    pub n_badtype_a: u16,
    pub n_badlen_a: u16,
    pub n_badcrc_a: u16,
    pub ack_skew_err: i32,
    pub tx_count_s: u8,
    pub rx_count_s: u8,
    pub scan_channel: u8,
    pub stats: PhaseStats,
}

pub(crate) fn emit(s: &EpochSummary, records: &[TaRecord]) {
    if !s.is_sink {
        info!(
            "S {}:{} {} {}:{} {} {}",
            s.epoch, s.n_ta_tx, s.n_all_acks, s.synced_with_ack, s.sync_missed, s.period_skew, s.hops
        );
        info!(
            "P {}:{} {} {}:{} {} {} {}:{}",
            s.epoch,
            s.recv_src_s,
            s.recv_kind_s,
            s.recv_len_s,
            s.n_bad_acks,
            s.n_badtype_a,
            s.n_badlen_a,
            s.n_badcrc_a,
            s.ack_skew_err
        );
    }
    info!(
        "R {}:{} {}:{} {} {}",
        s.epoch,
        s.n_ta,
        records.len(),
        s.scan_channel,
        s.tx_count_s,
        s.rx_count_s
    );
    for r in records {
        debug!(
            "T {}:{} {:?}:{} {} {} {}:{} {} {} {:x}",
            s.epoch,
            r.n_ta,
            r.status,
            r.src,
            r.seqn,
            r.kind,
            r.length,
            r.t_rx_count,
            r.a_rx_count,
            r.acked,
            r.status_reg
        );
    }
    info!(
        "F {}:{} {} {}:{} {} {}:{} {} {}",
        s.epoch,
        s.stats.tf[PHASE_S],
        s.stats.tf[PHASE_T],
        s.stats.tf[PHASE_A],
        s.stats.ton[PHASE_S],
        s.stats.ton[PHASE_T],
        s.stats.ton[PHASE_A],
        s.stats.n_short[PHASE_S],
        s.stats.n_short[PHASE_T],
        s.stats.n_short[PHASE_A]
    );
}
