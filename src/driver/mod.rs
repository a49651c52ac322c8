//! The Crystal protocol engine.
//!
//! One [`Crystal`] instance is the whole per-node protocol state: the
//! epoch schedule, the S/T/A slot state machine, synchronization
//! tracking, and the per-epoch log. It owns its three collaborators
//! (flood primitive, platform capabilities, application callbacks) and
//! is driven entirely by [`tick`][Crystal::tick] calls from the
//! embedding's one real-time timer.

mod node;
mod sink;
mod slot;

use log::info;

use crate::app::{App, Platform};
use crate::config::{Config, StartError};
use crate::flood::{Flood, UNKNOWN_INITIATOR};
use crate::frame::{Addr, Epoch, PktBuf, PKT_BUF_LEN};
use crate::logging::{emit, EpochLogger, EpochSummary, PhaseStats};
use crate::sync::SyncState;
use crate::timing::{Layout, Ticks};

use self::slot::{SlotExec, SlotStep};

/// What the embedding must do after a [`tick`][Crystal::tick].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    /// Arm the timer at this absolute time and call `tick` again when
    /// it fires.
    WaitUntil(Ticks),
    /// The driver is done: it was stopped, the bootstrap scan failed,
    /// or a system reset was requested. Do not re-arm.
    Stopped,
}

/// Live read-only status.
#[derive(Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Info {
    pub epoch: Epoch,
    pub n_ta: u16,
    pub n_missed_s: u16,
    pub hops: u16,
}

/// Resume points of the epoch state machine. Everything between two
/// suspension points runs inside a single `tick`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Idle,
    SinkBoot,
    SinkEpochBegin,
    SinkSArm,
    SinkSRun,
    SinkTRun,
    SinkARun,
    SinkPreEpoch,
    NodeBoot,
    ScanRun,
    NodeSArm,
    NodeSRun,
    NodeTRun,
    NodeARun,
    NodePreEpoch,
    NodeEpochGate,
}

/// Counters zeroed at the top of every epoch.
#[derive(Clone, Copy, Default, Debug)]
struct EpochState {
    n_empty_ts: u16,
    n_noacks: u16,
    n_bad_acks: u16,
    n_all_acks: u16,
    n_ta_tx: u16,
    n_badtype_a: u16,
    n_badlen_a: u16,
    n_badcrc_a: u16,
    n_radio_reception_errors: u16,
    recv_kind_s: u8,
    recv_len_s: u8,
    recv_src_s: Addr,
    rx_count_s: u8,
    tx_count_s: u8,
    rx_count_t: u8,
    rx_count_a: u8,
    sleep_order: bool,
}

macro_rules! run_slot {
    ($self:ident, $after:ident) => {
        match $self.exec.advance(&mut $self.flood, &mut $self.buf) {
            SlotStep::Wait(t) => Step::WaitUntil(t),
            SlotStep::Done(h) => $self.$after(h),
        }
    };
}

/// The protocol driver.
///
/// Construct it once with [`new`][Crystal::new], configure and arm it
/// with [`start`][Crystal::start], then call [`tick`][Crystal::tick]
/// at every returned deadline. All application interaction happens
/// through the [`App`] callbacks, synchronously, between slots.
pub struct Crystal<F: Flood, P: Platform, A: App> {
    flood: F,
    platform: P,
    app: A,

    conf: Config,
    layout: Layout,
    node_id: Addr,

    buf: PktBuf,
    // Payload staging between a callback and the slot that carries it.
    staging: [u8; PKT_BUF_LEN],

    exec: SlotExec,
    phase: Phase,
    stop_requested: bool,

    epoch: Epoch,
    n_ta: u16,
    sink_id: Addr,
    hopcount: u16,
    es: EpochState,
    sync: SyncState,
    stats: PhaseStats,
    logger: EpochLogger,

    t_ref_root: Ticks,
    t_s_start: Ticks,
    t_s_stop: Ticks,
    t_wakeup: Ticks,

    skip_s: bool,
    starting_n_ta: u16,
    scan_elapsed: u32,

    have_packet: bool,
    i_tx: bool,
    correct_packet: bool,
}

impl<F: Flood, P: Platform, A: App> Crystal<F, P, A> {
    /// One-shot construction; initializes the flood primitive.
    pub fn new(mut flood: F, platform: P, app: A) -> Self {
        flood.init();
        Crystal {
            flood,
            platform,
            app,
            conf: Config::default(),
            layout: Layout::new(&Config::default()),
            node_id: UNKNOWN_INITIATOR,
            buf: PktBuf::new(),
            staging: [0; PKT_BUF_LEN],
            exec: SlotExec::new(),
            phase: Phase::Idle,
            stop_requested: false,
            epoch: 0,
            n_ta: 0,
            sink_id: UNKNOWN_INITIATOR,
            hopcount: 0,
            es: EpochState::default(),
            sync: SyncState::default(),
            stats: PhaseStats::default(),
            logger: EpochLogger::new(),
            t_ref_root: Ticks(0),
            t_s_start: Ticks(0),
            t_s_stop: Ticks(0),
            t_wakeup: Ticks(0),
            skip_s: false,
            starting_n_ta: 0,
            scan_elapsed: 0,
            have_packet: false,
            i_tx: false,
            correct_packet: false,
        }
    }

    /// Validate `config`, reset all protocol state and arm the run.
    ///
    /// On success returns the first timer deadline, a few ticks past
    /// `now`; the embedding arms its timer there and starts ticking.
    pub fn start(&mut self, config: Config, now: Ticks) -> Result<Ticks, StartError> {
        config.validate()?;

        info!(
            "starting crystal, node {} sink {} period {}",
            self.platform.node_id(),
            config.is_sink,
            config.period
        );

        self.layout = Layout::new(&config);
        self.conf = config;
        self.node_id = self.platform.node_id();

        self.epoch = 0;
        self.n_ta = 0;
        self.sink_id = UNKNOWN_INITIATOR;
        self.hopcount = 0;
        self.es = EpochState::default();
        self.sync.reset();
        self.stats = PhaseStats::default();
        self.logger.clear();
        self.buf.zero();
        self.exec = SlotExec::new();
        self.skip_s = false;
        self.starting_n_ta = 0;
        self.scan_elapsed = 0;
        self.have_packet = false;
        self.i_tx = false;
        self.correct_packet = false;
        self.stop_requested = false;

        self.phase = if self.conf.is_sink {
            Phase::SinkBoot
        } else {
            Phase::NodeBoot
        };
        Ok(now + 10)
    }

    /// Advance the protocol at a timer fire. `now` is the current value
    /// of the timer the deadlines refer to.
    pub fn tick(&mut self, now: Ticks) -> Step {
        if self.stop_requested || self.phase == Phase::Idle {
            self.phase = Phase::Idle;
            return Step::Stopped;
        }
        match self.phase {
            Phase::Idle => Step::Stopped,
            Phase::SinkBoot => self.sink_boot(now),
            Phase::SinkEpochBegin => self.sink_epoch_begin(),
            Phase::SinkSArm => self.sink_arm_s(),
            Phase::SinkSRun => run_slot!(self, sink_after_s),
            Phase::SinkTRun => run_slot!(self, sink_after_t),
            Phase::SinkARun => run_slot!(self, sink_after_a),
            Phase::SinkPreEpoch => self.sink_pre_epoch(),
            Phase::NodeBoot => self.node_boot(now),
            Phase::ScanRun => match self.exec.advance(&mut self.flood, &mut self.buf) {
                SlotStep::Wait(t) => Step::WaitUntil(t),
                SlotStep::Done(h) => self.scan_harvest(h, now),
            },
            Phase::NodeSArm => self.node_arm_s(),
            Phase::NodeSRun => run_slot!(self, node_after_s),
            Phase::NodeTRun => run_slot!(self, node_after_t),
            Phase::NodeARun => run_slot!(self, node_after_a),
            Phase::NodePreEpoch => self.node_pre_epoch(),
            Phase::NodeEpochGate => self.node_epoch_gate(),
        }
    }

    /// Cancel the run. Takes effect at the next timer fire, which
    /// reports [`Step::Stopped`] instead of re-arming.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn config(&self) -> &Config {
        &self.conf
    }

    pub fn info(&self) -> Info {
        Info {
            epoch: self.epoch,
            n_ta: self.n_ta,
            n_missed_s: self.sync.sync_missed,
            hops: self.hopcount,
        }
    }

    /// TA records accumulated since the last
    /// [`print_epoch_logs`][Crystal::print_epoch_logs].
    pub fn ta_records(&self) -> &[crate::logging::TaRecord] {
        self.logger.records()
    }

    /// Emit the diagnostic records accumulated since the previous call
    /// and clear them. Call from process context, not from the timer.
    pub fn print_epoch_logs(&mut self) {
        let summary = EpochSummary {
            is_sink: self.conf.is_sink,
            epoch: self.epoch,
            n_ta: self.n_ta,
            n_ta_tx: self.es.n_ta_tx,
            n_all_acks: self.es.n_all_acks,
            synced_with_ack: self.sync.synced_with_ack,
            sync_missed: self.sync.sync_missed,
            period_skew: self.sync.period_skew,
            hops: self.hopcount,
            recv_src_s: self.es.recv_src_s,
            recv_kind_s: self.es.recv_kind_s,
            recv_len_s: self.es.recv_len_s,
            n_bad_acks: self.es.n_bad_acks,
            n_badtype_a: self.es.n_badtype_a,
            n_badlen_a: self.es.n_badlen_a,
            n_badcrc_a: self.es.n_badcrc_a,
            ack_skew_err: self.sync.log_ack_skew_err,
            tx_count_s: self.es.tx_count_s,
            rx_count_s: self.es.rx_count_s,
            scan_channel: 0,
            stats: self.stats,
        };
        emit(&summary, self.logger.records());
        self.logger.clear();
    }

    /// Zero out everything scoped to one epoch.
    fn begin_epoch_state(&mut self) {
        self.es = EpochState::default();
        self.stats = PhaseStats::default();
        self.sync.begin_epoch();
        self.n_ta = 0;
        self.have_packet = false;
        self.i_tx = false;
        self.correct_packet = false;
    }
}
