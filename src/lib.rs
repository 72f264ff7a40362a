//! # callchain
//!
//! **Synchronous, push-based chains of processing stages.**
//!
//! A chain is an ordered sequence of stages. A single producer pushes data
//! into the head; every stage transforms what it receives and forwards the
//! result to the next one, until the data reaches a terminal receiver.
//!
//! ```text
//! Just → map → filter → map → take → Receiver
//! ```
//!
//! Everything runs on the caller's thread: [`Chain::run`] returns once the
//! pushed input has travelled as far as it can go.
//!
//! ---
//!
//! ## Signals
//!
//! Stages talk through three signals:
//!
//! - **data** travels forward, one item at a time;
//! - **completion** and **error** travel forward from the stage that raised
//!   them, at most once per stage and run;
//! - **stop** travels backward: a stage can mark every earlier stage as
//!   stopped (this is how [`Take`] ends a producer early).
//!
//! Each stage has a [`State`]. It only accepts and forwards data while
//! `Active`; every stage is reset to `Active` at the start of each run.
//!
//! ---
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use callchain::prelude::*;
//!
//! #[derive(Default, Clone)]
//! struct Log(Rc<RefCell<Vec<String>>>);
//!
//! impl Receiver<String> for Log {
//!     fn on_receive(&mut self, item: String) {
//!         self.0.borrow_mut().push(item);
//!     }
//!     fn on_error(&mut self, cause: &Error) {
//!         self.0.borrow_mut().push(format!("error: {cause}"));
//!     }
//!     fn on_complete(&mut self) {
//!         self.0.borrow_mut().push("complete".into());
//!     }
//! }
//!
//! let log = Log::default();
//! let mut chain = Chain::<()>::new();
//! chain
//!     .just(vec![1, 2, 3])?
//!     .flat_array()
//!     .map(|x| x * 10)
//!     .map(|x| format!("value {x}"))
//!     .receiver(log.clone());
//!
//! chain.start()?;
//! assert_eq!(
//!     *log.0.borrow(),
//!     ["value 10", "value 20", "value 30", "complete"]
//! );
//! # Ok::<(), callchain::error::Error>(())
//! ```
//!
//! ---
//!
//! ## Custom stages
//!
//! Implement [`Stage`] to emit zero, one or many items per input. Producers
//! should check [`Emitter::can_work`] before each emission so that stop
//! requests from later stages are honoured.
//!
//! ```
//! use callchain::prelude::*;
//!
//! /// Emits `0..n` for every `n` it receives.
//! struct Count;
//!
//! impl Stage<u32> for Count {
//!     type Out = u32;
//!
//!     fn push(&mut self, n: u32, out: &mut Emitter<'_, u32>) {
//!         for i in 0..n {
//!             if !out.can_work() {
//!                 break;
//!             }
//!             out.send(i);
//!         }
//!     }
//! }
//!
//! let mut chain = Chain::<u32>::new();
//! chain.add(Count)?.take(3);
//! chain.run(1_000_000)?;
//! assert_eq!(chain.states()[0], State::Stopped);
//! # Ok::<(), callchain::error::Error>(())
//! ```
//!
//! ---
//!
//! ## Error Handling Contract
//!
//! Misusing a chain (running it empty, running it again while its previous
//! run never finished, appending after a receiver, appending a stage of the
//! wrong type) returns an [`Error`] from the offending call.
//!
//! Data-flow failures, such as a missing value reaching a flatten operator,
//! travel through the error signal instead. They never reach earlier stages,
//! cannot be suppressed by taps and only become visible to the receiver.
//!
//! ---
//!
//! ## Observability
//!
//! With the `tracing` feature (enabled by default) the crate emits a
//! `callchain.run` span per run and structured events such as
//! `callchain.error`, `callchain.complete`, `callchain.stop_upstream`,
//! `callchain.run.rejected`, `callchain.stage.removed` and, when
//! [`ChainConfig::trace_items`] is set, `callchain.item`.
//!
//! ```ignore
//! use tracing_subscriber::fmt;
//!
//! fn main() {
//!     fmt().with_env_filter("callchain=debug").init();
//! }
//! ```
//!
//! ---
//!
//! ## Feature Flags
//!
//! - `tracing` *(default)*: structured spans and events.
//!
//! [`Chain::run`]: pipeline::chain::Chain::run
//! [`Take`]: pipeline::take::Take
//! [`State`]: pipeline::state::State
//! [`Stage`]: pipeline::stage::Stage
//! [`Emitter::can_work`]: pipeline::emit::Emitter::can_work
//! [`Error`]: error::Error
//! [`ChainConfig::trace_items`]: pipeline::config::ChainConfig::trace_items

pub mod error;
pub mod pipeline;

pub mod prelude {
    //! Convenient imports for most `callchain` users.

    pub use crate::error::{Error, Result};
    pub use crate::pipeline::chain::{Chain, StageRef};
    pub use crate::pipeline::config::ChainConfig;
    pub use crate::pipeline::emit::Emitter;
    pub use crate::pipeline::flatten::{Elements, Flatten, Iter, Sequence};
    pub use crate::pipeline::just::Just;
    pub use crate::pipeline::stage::{Receiver, Stage, StageId};
    pub use crate::pipeline::state::State;
    pub use crate::pipeline::take::Take;
}
