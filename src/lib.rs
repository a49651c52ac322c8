//! Time-triggered many-to-one data collection over concurrent
//! transmissions.
//!
//! Crystal drives every node of a UWB network through tight, fixed
//! rounds ("epochs"). The sink opens each epoch with a synchronization
//! flood (S), then runs pairs of contention data floods (T) and
//! acknowledgment floods (A) until the round goes quiet; non-sink nodes
//! ride the same schedule, delivering one packet per T slot and obeying
//! the sleep/awake command carried in each A. The only communication
//! primitive is a network-wide flood, consumed through the
//! [`Flood`][flood::Flood] trait.
//!
//! The engine is a single resumable state machine with no thread and no
//! allocation in the epoch schedule: every [`tick`][driver::Crystal::tick]
//! runs the protocol up to its next suspension point and hands back the
//! absolute deadline to wake at.
//!
//! ## Example
//!
//! ```no_run
//! use crystal::app::{App, Platform};
//! use crystal::config::Config;
//! use crystal::driver::{Crystal, Step};
//! use crystal::flood::{Flood, FloodParams, Harvest};
//! use crystal::timing::Ticks;
//!
//! struct Radio; // bindings to the platform's flood primitive
//! impl Flood for Radio {
//!     fn init(&mut self) {}
//!     fn start(&mut self, _params: FloodParams, _frame: &[u8]) {}
//!     fn stop(&mut self, _frame: &mut [u8]) -> Harvest {
//!         Harvest::default()
//!     }
//! }
//!
//! struct Board;
//! impl Platform for Board {
//!     fn node_id(&self) -> u16 {
//!         1
//!     }
//!     fn radio_on(&mut self) {}
//!     fn radio_off(&mut self) {}
//!     fn system_reset(&mut self) {}
//! }
//!
//! struct Collector; // the sink application
//! impl App for Collector {
//!     fn pre_s(&mut self, _payload: &mut [u8]) {}
//!     fn post_s(&mut self, _received: bool, _payload: &[u8]) {}
//!     fn pre_t(&mut self, _payload: &mut [u8]) -> bool {
//!         false // the sink never contends for T slots
//!     }
//!     fn between_ta(&mut self, received: bool, payload: &[u8], _ack_payload: &mut [u8]) {
//!         if received {
//!             // one data packet collected; payload is valid here only
//!         }
//!     }
//!     fn post_a(&mut self, _received: bool, _payload: &[u8]) {}
//!     fn epoch_end(&mut self) {}
//!     fn pre_epoch(&mut self) {}
//!     fn start_done(&mut self, _success: bool) {}
//! }
//!
//! let mut crystal = Crystal::new(Radio, Board, Collector);
//! let config = Config {
//!     is_sink: true,
//!     plds_t: 4,
//!     ..Config::default()
//! };
//!
//! let mut deadline = crystal.start(config, Ticks(0)).unwrap();
//! loop {
//!     let now = deadline; // a real port blocks on its rtimer here
//!     match crystal.tick(now) {
//!         Step::WaitUntil(t) => deadline = t,
//!         Step::Stopped => break,
//!     }
//! }
//! ```

pub mod app;
pub mod config;
pub mod driver;
pub mod flood;
pub mod frame;
mod logging;
mod sync;
pub mod timing;

pub use crate::app::{App, AppLog, Platform};
pub use crate::config::{Config, StartError, Timing};
pub use crate::driver::{Crystal, Info, Step};
pub use crate::logging::{TaRecord, TaStatus, MAX_LOG_TAS};
pub use crate::timing::Ticks;
