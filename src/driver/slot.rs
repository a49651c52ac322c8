use crate::flood::{Flood, FloodParams, Harvest};
use crate::frame::PktBuf;
use crate::timing::Ticks;

/// One scheduled flood, bounded by absolute start and stop times.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot {
    pub t_start: Ticks,
    pub t_stop: Ticks,
    pub params: FloodParams,
}

pub(crate) enum SlotStep {
    /// Suspend until the given absolute time.
    Wait(Ticks),
    /// The slot finished and this is what the flood reported.
    Done(Harvest),
}

#[derive(Clone, Copy)]
enum ExecState {
    Idle,
    Armed(Slot),
    Started(Slot),
}

/// The slot executor: the only place that suspends inside an epoch.
///
/// A slot runs in two timer fires: at the slot start the flood is
/// started and the executor suspends until the slot stop; at the stop
/// the flood is stopped and its results are harvested. A flood that
/// produced nothing by the stop simply harvests zero receptions.
pub(crate) struct SlotExec {
    state: ExecState,
}

impl SlotExec {
    pub fn new() -> SlotExec {
        SlotExec {
            state: ExecState::Idle,
        }
    }

    /// Schedule `slot` and return the deadline to suspend on.
    pub fn arm(&mut self, slot: Slot) -> Ticks {
        let start = slot.t_start;
        self.state = ExecState::Armed(slot);
        start
    }

    /// Drive the armed slot from a timer fire.
    pub fn advance<F: Flood>(&mut self, flood: &mut F, buf: &mut PktBuf) -> SlotStep {
        match self.state {
            ExecState::Armed(slot) => {
                flood.start(slot.params, buf.raw());
                self.state = ExecState::Started(slot);
                SlotStep::Wait(slot.t_stop)
            }
            ExecState::Started(_) => {
                self.state = ExecState::Idle;
                SlotStep::Done(flood.stop(buf.raw_mut()))
            }
            // The phase dispatch only advances while a slot is in
            // flight; an idle fire harvests nothing.
            ExecState::Idle => SlotStep::Done(Harvest::default()),
        }
    }
}
