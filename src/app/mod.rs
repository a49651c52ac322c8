//! Callback and platform capability surfaces.
//!
//! Every callback runs in timer context between slots, inside the
//! cooperative schedule: it must not block, and on an embedded target it
//! must not allocate. Payload windows handed to the callbacks alias the
//! shared slot buffer and are only valid for the duration of the call.

use crate::frame::Addr;

/// Application-owned fields of a TA log record.
///
/// The embedding application tracks its own sequence numbers and ack
/// bookkeeping; the driver samples this once per TA pair (through
/// [`App::ta_log`]) when it writes the record.
#[derive(Clone, Copy, Default, Debug)]
pub struct AppLog {
    pub send_seqn: u16,
    pub recv_seqn: u16,
    pub recv_src: Addr,
    pub acked: bool,
}

/// Application ingress points, invoked synchronously between slots.
pub trait App {
    /// Before each S slot. At the sink, fill `payload` with the S
    /// application payload; elsewhere the window content is ignored.
    fn pre_s(&mut self, payload: &mut [u8]);

    /// After the S slot. `received` is false at the sink.
    fn post_s(&mut self, received: bool, payload: &[u8]);

    /// Before each T slot. Fill `payload` and return true to contend
    /// for this TA pair with a data packet; return false to listen.
    fn pre_t(&mut self, payload: &mut [u8]) -> bool;

    /// Between the T and A slots of a pair. `payload` is the T payload
    /// window (valid data iff `received`). The sink must fill
    /// `ack_payload` with the A application payload; elsewhere it is
    /// ignored.
    fn between_ta(&mut self, received: bool, payload: &[u8], ack_payload: &mut [u8]);

    /// After the A slot. `received` is false at the sink.
    fn post_a(&mut self, received: bool, payload: &[u8]);

    /// The active portion of the epoch is over.
    fn epoch_end(&mut self);

    /// Pinged shortly before the next epoch starts.
    fn pre_epoch(&mut self);

    /// Fired once: after the bootstrap scan at a non-sink (with its
    /// outcome), immediately at the sink (always `true`).
    fn start_done(&mut self, success: bool);

    /// Application fields for the TA record being written.
    fn ta_log(&self) -> AppLog {
        AppLog::default()
    }
}

/// Platform capabilities the driver consumes but does not implement.
pub trait Platform {
    /// Stable nonzero node address (zero is the unknown-initiator
    /// sentinel).
    fn node_id(&self) -> Addr;

    /// Power the radio oscillator up before the active portion of an
    /// epoch. The driver budgets `osc_stab_time` before using it.
    fn radio_on(&mut self);

    /// Put the radio into deep sleep for the inactive portion.
    fn radio_off(&mut self);

    /// Request a system reset after prolonged synchronization loss.
    /// On embedded targets this does not return.
    fn system_reset(&mut self);
}
