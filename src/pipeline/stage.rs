use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Error;
use crate::pipeline::emit::{unbox, Cursor, Emitter, Item, Node};

/// One link of a [`Chain`](crate::pipeline::chain::Chain).
///
/// `push` receives every item that reaches this stage while it is active and
/// emits zero, one or many outputs through the [`Emitter`]. A plain
/// transform calls `out.send(..)` once; producers loop, checking
/// `out.can_work()` before each element so a stop request is honoured.
///
/// `on_error` and `on_complete` observe signals arriving from earlier
/// stages. The chain forwards those signals itself, so a stage cannot
/// swallow them. Signals a stage raises through its own emitter do not come
/// back to its hooks.
pub trait Stage<I>: 'static {
    type Out: 'static;

    fn push(&mut self, item: I, out: &mut Emitter<'_, Self::Out>);

    fn on_error(&mut self, _cause: &Error) {}

    fn on_complete(&mut self) {}

    /// Called on every stage before each run.
    fn reset(&mut self) {}

    fn stage_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The sink at the end of a chain.
///
/// Once a receiver is attached, nothing can be appended after it.
pub trait Receiver<T>: 'static {
    fn on_receive(&mut self, item: T);

    fn on_error(&mut self, cause: &Error);

    fn on_complete(&mut self);

    fn receiver_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Copyable handle to a stage appended to a chain, typed by the stage's
/// output.
///
/// Key `0` names the chain's input port rather than a stage.
pub struct StageId<O> {
    pub(crate) chain: u64,
    pub(crate) key: u64,
    _out: PhantomData<fn() -> O>,
}

impl<O> StageId<O> {
    pub(crate) fn new(chain: u64, key: u64) -> Self {
        Self {
            chain,
            key,
            _out: PhantomData,
        }
    }
}

impl<O> Clone for StageId<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for StageId<O> {}

impl<O> PartialEq for StageId<O> {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain && self.key == other.key
    }
}

impl<O> Eq for StageId<O> {}

impl<O> fmt::Debug for StageId<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageId")
            .field("chain", &self.chain)
            .field("key", &self.key)
            .finish()
    }
}

pub(crate) struct StageNode<S, I> {
    pub(crate) stage: S,
    _in: PhantomData<fn(I)>,
}

impl<S, I> StageNode<S, I> {
    pub(crate) fn new(stage: S) -> Self {
        Self {
            stage,
            _in: PhantomData,
        }
    }
}

impl<S, I> Node for StageNode<S, I>
where
    S: Stage<I>,
    I: 'static,
{
    fn name(&self) -> &'static str {
        self.stage.stage_name()
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let item = unbox::<I>(item, &mut cursor)?;
        self.stage.push(item, &mut Emitter::new(cursor));
        None
    }

    fn on_error(&mut self, cause: &Error) {
        self.stage.on_error(cause);
    }

    fn on_complete(&mut self) {
        self.stage.on_complete();
    }

    fn reset(&mut self) {
        self.stage.reset();
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        &mut self.stage
    }
}

/// A stage that ignores whatever it is pushed, such as
/// [`Just`](crate::pipeline::just::Just).
pub(crate) struct ProducerNode<S> {
    pub(crate) stage: S,
}

impl<S> Node for ProducerNode<S>
where
    S: Stage<()>,
{
    fn name(&self) -> &'static str {
        self.stage.stage_name()
    }

    fn receive(&mut self, _item: Item, cursor: Cursor<'_>) -> Option<Item> {
        self.stage.push((), &mut Emitter::new(cursor));
        None
    }

    fn on_error(&mut self, cause: &Error) {
        self.stage.on_error(cause);
    }

    fn on_complete(&mut self) {
        self.stage.on_complete();
    }

    fn reset(&mut self) {
        self.stage.reset();
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        &mut self.stage
    }
}

pub(crate) struct ReceiverNode<R, T> {
    pub(crate) receiver: R,
    _in: PhantomData<fn(T)>,
}

impl<R, T> ReceiverNode<R, T> {
    pub(crate) fn new(receiver: R) -> Self {
        Self {
            receiver,
            _in: PhantomData,
        }
    }
}

impl<R, T> Node for ReceiverNode<R, T>
where
    R: Receiver<T>,
    T: 'static,
{
    fn name(&self) -> &'static str {
        self.receiver.receiver_name()
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let item = unbox::<T>(item, &mut cursor)?;
        self.receiver.on_receive(item);
        None
    }

    fn on_error(&mut self, cause: &Error) {
        self.receiver.on_error(cause);
    }

    fn on_complete(&mut self) {
        self.receiver.on_complete();
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        &mut self.receiver
    }
}
