//! Signal forwarding between the stages of a running chain.
//!
//! Every stage sits at a *position* in the run's state table. Position `0` is
//! reserved for an external worker driven by
//! [`Chain::run_worker`](crate::pipeline::chain::Chain::run_worker); chain
//! stage `k` sits at position `k + 1`.
//!
//! Data travels forward through [`deliver`]. Stages that turn one item into
//! at most one item hand their output back to the loop instead of calling
//! the next stage themselves, so only stages that emit through an
//! [`Emitter`] add call-stack frames.

use std::any::Any;
use std::marker::PhantomData;

use crate::error::Error;
use crate::pipeline::state::State;

pub(crate) type Item = Box<dyn Any>;

/// Type-erased stage as stored by the chain.
pub(crate) trait Node {
    fn name(&self) -> &'static str;

    /// Handle one item. Returning `Some` forwards that item to the next stage.
    fn receive(&mut self, item: Item, cursor: Cursor<'_>) -> Option<Item>;

    fn on_error(&mut self, _cause: &Error) {}

    fn on_complete(&mut self) {}

    fn reset(&mut self) {}

    fn is_terminal(&self) -> bool {
        false
    }

    /// The user-facing stage behind this node, for
    /// [`Chain::stage_mut`](crate::pipeline::chain::Chain::stage_mut).
    fn inner_mut(&mut self) -> &mut dyn Any;
}

/// Untyped view of the chain from one position during a run.
pub(crate) struct Cursor<'a> {
    position: usize,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    stage: &'static str,
    states: &'a mut [State],
    downstream: &'a mut [Box<dyn Node>],
    trace: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        position: usize,
        stage: &'static str,
        states: &'a mut [State],
        downstream: &'a mut [Box<dyn Node>],
        trace: bool,
    ) -> Self {
        Self {
            position,
            stage,
            states,
            downstream,
            trace,
        }
    }

    pub(crate) fn can_work(&self) -> bool {
        self.states[self.position].is_active()
    }

    pub(crate) fn send(&mut self, item: Item) {
        if !self.can_work() {
            return;
        }
        deliver(
            &mut *self.states,
            &mut *self.downstream,
            self.position + 1,
            item,
            self.trace,
        );
    }

    pub(crate) fn fail(&mut self, cause: Error) {
        if !self.can_work() {
            return;
        }
        self.states[self.position] = State::Errored;

        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::DEBUG,
            event = "callchain.error",
            stage = self.stage,
            position = self.position,
            error = %cause,
            "callchain.error"
        );

        propagate_error(
            &mut *self.states,
            &mut *self.downstream,
            self.position + 1,
            &cause,
        );
    }

    pub(crate) fn complete(&mut self) {
        if !self.can_work() {
            return;
        }
        self.states[self.position] = State::Completed;

        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::DEBUG,
            event = "callchain.complete",
            stage = self.stage,
            position = self.position,
            "callchain.complete"
        );

        propagate_complete(&mut *self.states, &mut *self.downstream, self.position + 1);
    }

    pub(crate) fn request_stop_upstream(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::DEBUG,
            event = "callchain.stop_upstream",
            stage = self.stage,
            position = self.position,
            "callchain.stop_upstream"
        );

        stop_before(self.states, self.position);
    }
}

/// Typed handle a [`Stage`](crate::pipeline::stage::Stage) uses to talk to
/// the rest of the chain while it handles one item.
///
/// `send` is the only way data leaves a stage, and it silently drops the
/// item once this stage is no longer active or has no successor.
pub struct Emitter<'a, O> {
    cursor: Cursor<'a>,
    _out: PhantomData<fn(O)>,
}

impl<'a, O: 'static> Emitter<'a, O> {
    pub(crate) fn new(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            _out: PhantomData,
        }
    }

    /// `true` while this stage may still emit.
    pub fn can_work(&self) -> bool {
        self.cursor.can_work()
    }

    /// Index of this stage in the chain; `None` for a worker driven by
    /// [`Chain::run_worker`](crate::pipeline::chain::Chain::run_worker).
    pub fn index(&self) -> Option<usize> {
        self.cursor.position.checked_sub(1)
    }

    /// Forward `item` to the next stage and run it through the rest of the
    /// chain before returning.
    pub fn send(&mut self, item: O) {
        if self.cursor.can_work() {
            self.cursor.send(Box::new(item));
        }
    }

    /// Signal an error from this stage to every later stage.
    ///
    /// Ignored when this stage already left `Active`.
    pub fn fail(&mut self, cause: Error) {
        self.cursor.fail(cause);
    }

    /// Signal completion from this stage to every later stage.
    ///
    /// Ignored when this stage already left `Active`.
    pub fn complete(&mut self) {
        self.cursor.complete();
    }

    /// Mark every earlier stage as stopped. This stage and the ones after it
    /// keep working.
    pub fn request_stop_upstream(&mut self) {
        self.cursor.request_stop_upstream();
    }
}

/// Recover the concrete item a stage was built for.
///
/// Appends are type-checked, so a mismatch means the chain was rewired under
/// a running stage; it is reported as a data-flow error from that stage.
pub(crate) fn unbox<T: 'static>(item: Item, cursor: &mut Cursor<'_>) -> Option<T> {
    match item.downcast::<T>() {
        Ok(value) => Some(*value),
        Err(_) => {
            reject::<T>(cursor);
            None
        }
    }
}

pub(crate) fn reject<T: 'static>(cursor: &mut Cursor<'_>) {
    cursor.fail(Error::type_mismatch(
        std::any::type_name::<T>(),
        "a value of another type",
    ));
}

/// Push `item` into the first of `nodes`, which sits at `position`.
pub(crate) fn deliver(
    states: &mut [State],
    nodes: &mut [Box<dyn Node>],
    mut position: usize,
    mut item: Item,
    trace: bool,
) {
    let mut line = nodes;
    loop {
        let Some((node, rest)) = std::mem::take(&mut line).split_first_mut() else {
            return;
        };
        if !states[position].is_active() {
            return;
        }

        #[cfg(feature = "tracing")]
        if trace {
            tracing::event!(
                tracing::Level::TRACE,
                event = "callchain.item",
                stage = node.name(),
                position = position,
                "callchain.item"
            );
        }

        let cursor = Cursor::new(position, node.name(), &mut *states, &mut *rest, trace);
        let Some(out) = node.receive(item, cursor) else {
            return;
        };
        if !states[position].is_active() {
            return;
        }
        item = out;
        position += 1;
        line = rest;
    }
}

/// Walk the error forward from `position` until a stage that already left
/// `Active`.
pub(crate) fn propagate_error(
    states: &mut [State],
    nodes: &mut [Box<dyn Node>],
    position: usize,
    cause: &Error,
) {
    for (offset, node) in nodes.iter_mut().enumerate() {
        let at = position + offset;
        if !states[at].is_active() {
            return;
        }
        states[at] = State::Errored;
        node.on_error(cause);
    }
}

pub(crate) fn propagate_complete(states: &mut [State], nodes: &mut [Box<dyn Node>], position: usize) {
    for (offset, node) in nodes.iter_mut().enumerate() {
        let at = position + offset;
        if !states[at].is_active() {
            return;
        }
        states[at] = State::Completed;
        node.on_complete();
    }
}

/// Mark every position strictly before `position` as stopped.
pub(crate) fn stop_before(states: &mut [State], position: usize) {
    let end = position.min(states.len());
    for state in &mut states[..end] {
        *state = State::Stopped;
    }
}
