//! Resource events and the event queue.
//!
//! - [`SiteEvent`] / [`GlideinEvent`]: state machine inputs raised by API
//!   calls, Condor job listeners, and other resources.
//! - [`EventQueue`]: cloneable, non-blocking handle for raising events.
//! - [`EventQueue::run`]: the single dispatcher loop that hands events to an
//!   [`EventHandler`] in arrival order.

pub mod event;
pub mod queue;

pub use event::{Event, GlideinEvent, GlideinEventCode, SiteEvent, SiteEventCode};
pub use queue::{EventHandler, EventQueue};
