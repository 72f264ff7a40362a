use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::pipeline::adapters::{
    CatchCompleteNode, CatchDataNode, CatchErrorNode, FilterNode, MapNode,
};
use crate::pipeline::config::ChainConfig;
use crate::pipeline::emit::{self, Cursor, Emitter, Node};
use crate::pipeline::flatten::{Elements, Flatten, FlattenNode, Sequence};
use crate::pipeline::just::Just;
use crate::pipeline::stage::{ProducerNode, Receiver, ReceiverNode, Stage, StageId, StageNode};
use crate::pipeline::state::State;
use crate::pipeline::take::Take;

static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Key of a chain's input port. Stage keys start at 1.
const INPUT_PORT: u64 = 0;

#[derive(Clone, Copy)]
struct Port {
    id: TypeId,
    name: &'static str,
}

impl Port {
    fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    fn accepts(self, other: Port) -> bool {
        self.id == other.id
    }
}

struct Meta {
    key: u64,
    /// `None` for producers, which ignore what they are pushed.
    input: Option<Port>,
    output: Port,
}

/// An ordered, index-addressable sequence of stages sharing one run
/// lifecycle.
///
/// `I` is the type [`Chain::run`] pushes into the head stage. Data flows
/// synchronously from the head to the tail; completion and errors travel
/// forward from where they were raised; stop requests travel backward.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use callchain::prelude::*;
///
/// struct Collect(Rc<RefCell<Vec<String>>>);
///
/// impl Receiver<String> for Collect {
///     fn on_receive(&mut self, item: String) {
///         self.0.borrow_mut().push(item);
///     }
///     fn on_error(&mut self, _cause: &Error) {}
///     fn on_complete(&mut self) {}
/// }
///
/// let out = Rc::new(RefCell::new(Vec::new()));
/// let mut chain = Chain::<()>::new();
/// chain
///     .just_all(vec![-2, -1, 0, 1, 2])?
///     .map(|x| x * 2)
///     .filter(|x| *x >= 0)
///     .map(|x| format!("item {x}"))
///     .take(2)
///     .receiver(Collect(out.clone()));
///
/// chain.start()?;
/// assert_eq!(*out.borrow(), ["item 0", "item 2"]);
/// # Ok::<(), callchain::error::Error>(())
/// ```
pub struct Chain<I> {
    id: u64,
    config: ChainConfig,
    nodes: Vec<Box<dyn Node>>,
    meta: Vec<Meta>,
    /// Position 0 belongs to an external worker; stage `k` is at `k + 1`.
    states: Vec<State>,
    next_key: u64,
    _input: PhantomData<fn(I)>,
}

impl<I: 'static> Chain<I> {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            id: NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed),
            config,
            nodes: Vec::new(),
            meta: Vec::new(),
            states: vec![State::Uninitialized],
            next_key: INPUT_PORT + 1,
            _input: PhantomData,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --------- building ----------------------------------------------------

    /// Append `stage` as the new tail and return a handle to it.
    ///
    /// Fails when the chain ends with a receiver or when the stage does not
    /// accept the current tail's output.
    pub fn add<X, S>(&mut self, stage: S) -> Result<StageRef<'_, I, S::Out>>
    where
        X: 'static,
        S: Stage<X>,
    {
        self.check_append(Some(Port::of::<X>()))?;
        let key = self.push_node(
            Box::new(StageNode::<S, X>::new(stage)),
            Some(Port::of::<X>()),
            Port::of::<S::Out>(),
        );
        Ok(StageRef::new(self, key))
    }

    /// Append a stage that ignores its input, such as a [`Just`].
    pub fn add_producer<S>(&mut self, stage: S) -> Result<StageRef<'_, I, S::Out>>
    where
        S: Stage<()>,
    {
        self.check_append(None)?;
        let key = self.push_node(
            Box::new(ProducerNode { stage }),
            None,
            Port::of::<S::Out>(),
        );
        Ok(StageRef::new(self, key))
    }

    /// Append a producer that emits `value` once and completes.
    pub fn just<T: Clone + 'static>(&mut self, value: T) -> Result<StageRef<'_, I, T>> {
        self.add_producer(Just::value(value))
    }

    /// Append a producer that emits each element of `values` and completes.
    pub fn just_all<T: Clone + 'static>(
        &mut self,
        values: impl Into<Vec<T>>,
    ) -> Result<StageRef<'_, I, T>> {
        self.add_producer(Just::all(values))
    }

    /// Append a producer that emits each element of `source` and completes.
    pub fn just_iter<T, It>(&mut self, source: It) -> Result<StageRef<'_, I, T>>
    where
        T: Clone + 'static,
        It: IntoIterator<Item = T> + Clone + 'static,
        It::IntoIter: 'static,
    {
        self.add_producer(Just::iter(source))
    }

    /// Terminate the chain with `receiver`. Nothing can be appended after it.
    pub fn receiver<T, R>(&mut self, receiver: R) -> Result<StageId<()>>
    where
        T: 'static,
        R: Receiver<T>,
    {
        self.check_append(Some(Port::of::<T>()))?;
        let key = self.push_node(
            Box::new(ReceiverNode::<R, T>::new(receiver)),
            Some(Port::of::<T>()),
            Port::of::<()>(),
        );
        Ok(StageId::new(self.id, key))
    }

    /// Fluent handle on the chain's input, for building a chain whose first
    /// stage is an operator.
    ///
    /// Also usable on a non-empty chain whose tail already outputs `I`.
    pub fn begin(&mut self) -> Result<StageRef<'_, I, I>> {
        self.check_append(Some(Port::of::<I>()))?;
        let key = self.meta.last().map_or(INPUT_PORT, |meta| meta.key);
        Ok(StageRef::new(self, key))
    }

    /// Reopen a fluent handle on the current tail.
    pub fn tail<O: 'static>(&mut self, id: StageId<O>) -> Result<StageRef<'_, I, O>> {
        if id.chain != self.id {
            return Err(Error::UnknownStage);
        }
        if id.key == INPUT_PORT {
            return if self.is_empty() {
                Ok(StageRef::new(self, INPUT_PORT))
            } else {
                Err(Error::NotTail { index: 0 })
            };
        }
        let index = self.index_of(id).ok_or(Error::UnknownStage)?;
        if index + 1 != self.len() {
            return Err(Error::NotTail { index });
        }
        self.check_append(None)?;
        Ok(StageRef::new(self, id.key))
    }

    /// Unlink a stage, reconnecting its predecessor to its successor.
    ///
    /// Fails with [`Error::UnknownStage`] for a handle from another chain or
    /// one already removed, and with [`Error::TypeMismatch`] when the
    /// successor would no longer accept the predecessor's output.
    pub fn remove<O>(&mut self, id: StageId<O>) -> Result<()> {
        if id.chain != self.id {
            return Err(Error::UnknownStage);
        }
        let index = self.index_of(id).ok_or(Error::UnknownStage)?;

        if let Some(next) = self.meta.get(index + 1) {
            let upstream = self.output_before(index);
            if let Some(input) = next.input {
                if !input.accepts(upstream) {
                    return Err(Error::type_mismatch(input.name, upstream.name));
                }
            }
        }

        let node = self.nodes.remove(index);
        self.meta.remove(index);
        self.states.remove(index + 1);

        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::DEBUG,
            event = "callchain.stage.removed",
            chain = self.config.chain_name(),
            stage = node.name(),
            index = index,
            "callchain.stage.removed"
        );
        drop(node);

        Ok(())
    }

    // --------- inspection --------------------------------------------------

    /// Current index of the stage behind `id`.
    pub fn index_of<O>(&self, id: StageId<O>) -> Option<usize> {
        if id.chain != self.id {
            return None;
        }
        self.meta.iter().position(|meta| meta.key == id.key)
    }

    pub fn state<O>(&self, id: StageId<O>) -> Option<State> {
        self.index_of(id).and_then(|index| self.state_at(index))
    }

    pub fn state_at(&self, index: usize) -> Option<State> {
        self.states.get(index + 1).copied()
    }

    /// States of every stage, head first.
    pub fn states(&self) -> Vec<State> {
        self.states[1..].to_vec()
    }

    /// State of the worker driven by the last [`Chain::run_worker`].
    pub fn worker_state(&self) -> State {
        self.states[0]
    }

    /// `true` while the stage at `index` may still emit.
    pub fn can_work(&self, index: usize) -> bool {
        self.state_at(index).is_some_and(State::is_active)
    }

    /// Borrow the concrete stage behind `id`, e.g. to call
    /// [`Take::set_count`].
    pub fn stage_mut<S: 'static, O>(&mut self, id: StageId<O>) -> Option<&mut S> {
        let index = self.index_of(id)?;
        self.nodes[index].inner_mut().downcast_mut::<S>()
    }

    // --------- running -----------------------------------------------------

    /// Reset every stage and push `input` into the head.
    pub fn run(&mut self, input: I) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyChain);
        }
        self.prepare()?;

        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!(
            "callchain.run",
            chain = self.config.chain_name(),
            stages = self.len()
        );
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let trace = self.config.traces_items();
        emit::deliver(&mut self.states, &mut self.nodes, 1, Box::new(input), trace);
        Ok(())
    }

    /// Run without an input value.
    pub fn start(&mut self) -> Result<()>
    where
        I: Default,
    {
        self.run(I::default())
    }

    /// Reset the chain and drive it from `worker`, which is linked ahead of
    /// the head for this run only.
    ///
    /// The worker is not stored: the same worker can drive many runs, and
    /// stop requests from the chain reach it like any other earlier stage.
    pub fn run_worker<J, W>(&mut self, worker: &mut W, input: J) -> Result<()>
    where
        W: Stage<J, Out = I>,
    {
        self.prepare()?;
        self.states[0] = State::Active;
        worker.reset();

        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!(
            "callchain.run",
            chain = self.config.chain_name(),
            stages = self.len(),
            worker = worker.stage_name()
        );
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let trace = self.config.traces_items();
        let cursor = Cursor::new(
            0,
            worker.stage_name(),
            &mut self.states[..],
            &mut self.nodes[..],
            trace,
        );
        worker.push(input, &mut Emitter::new(cursor));
        Ok(())
    }

    /// Mark every stage before `index` (and any worker) as stopped. The stage
    /// at `index` and the ones after it are untouched.
    pub fn stop_before(&mut self, index: usize) {
        emit::stop_before(&mut self.states, index + 1);
    }

    /// Stop every stage. A halted chain counts as finished and can run again.
    pub fn stop(&mut self) {
        let len = self.states.len();
        emit::stop_before(&mut self.states, len);
    }

    // --------- internals ---------------------------------------------------

    fn prepare(&mut self) -> Result<()> {
        if self.states.len() > 1 && self.states[self.states.len() - 1].is_active() {
            #[cfg(feature = "tracing")]
            tracing::event!(
                tracing::Level::WARN,
                event = "callchain.run.rejected",
                chain = self.config.chain_name(),
                "callchain.run.rejected"
            );
            return Err(Error::Reentrant);
        }

        self.states[0] = State::Uninitialized;
        for state in &mut self.states[1..] {
            *state = State::Active;
        }
        for node in &mut self.nodes {
            node.reset();
        }
        Ok(())
    }

    fn output_before(&self, index: usize) -> Port {
        match index.checked_sub(1) {
            Some(prev) => self.meta[prev].output,
            None => Port::of::<I>(),
        }
    }

    fn check_append(&self, input: Option<Port>) -> Result<()> {
        if let Some(tail) = self.nodes.last() {
            if tail.is_terminal() {
                return Err(Error::TerminalAppend { stage: tail.name() });
            }
        }
        let upstream = self.output_before(self.len());
        match input {
            Some(input) if !input.accepts(upstream) => {
                Err(Error::type_mismatch(upstream.name, input.name))
            }
            _ => Ok(()),
        }
    }

    fn push_node(&mut self, node: Box<dyn Node>, input: Option<Port>, output: Port) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.nodes.push(node);
        self.meta.push(Meta { key, input, output });
        self.states.push(State::Uninitialized);
        key
    }
}

impl<I: 'static> Default for Chain<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for Chain<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<_> = self
            .nodes
            .iter()
            .zip(&self.states[1..])
            .map(|(node, state)| (node.name(), *state))
            .collect();
        f.debug_struct("Chain")
            .field("name", &self.config.chain_name())
            .field("stages", &stages)
            .finish()
    }
}

/// Fluent handle on the tail of a chain, typed by the tail's output.
///
/// Every operator appends a new stage and returns a handle on it.
pub struct StageRef<'c, I, O> {
    chain: &'c mut Chain<I>,
    key: u64,
    _out: PhantomData<fn() -> O>,
}

impl<'c, I: 'static, O: 'static> StageRef<'c, I, O> {
    fn new(chain: &'c mut Chain<I>, key: u64) -> Self {
        Self {
            chain,
            key,
            _out: PhantomData,
        }
    }

    fn append<N: 'static>(self, node: Box<dyn Node>, input: Option<Port>) -> StageRef<'c, I, N> {
        let key = self.chain.push_node(node, input, Port::of::<N>());
        StageRef::new(self.chain, key)
    }

    fn typed<N: 'static>(self, node: Box<dyn Node>) -> StageRef<'c, I, N> {
        self.append(node, Some(Port::of::<O>()))
    }

    pub fn id(&self) -> StageId<O> {
        StageId::new(self.chain.id, self.key)
    }

    pub fn add<S: Stage<O>>(self, stage: S) -> StageRef<'c, I, S::Out> {
        self.typed(Box::new(StageNode::<S, O>::new(stage)))
    }

    /// 1-in/1-out transform.
    pub fn map<N, F>(self, f: F) -> StageRef<'c, I, N>
    where
        N: 'static,
        F: FnMut(O) -> N + 'static,
    {
        self.typed(Box::new(MapNode::<F, O>::new(f)))
    }

    /// Forward only the items matching `pred`; the rest are dropped silently.
    pub fn filter<F>(self, pred: F) -> StageRef<'c, I, O>
    where
        F: FnMut(&O) -> bool + 'static,
    {
        self.typed(Box::new(FilterNode::<F, O>::new(pred)))
    }

    /// Unroll sequences and iterables element by element; scalars pass as a
    /// single item. A missing value is signalled as an error.
    pub fn flat_map(self) -> StageRef<'c, I, O::Item>
    where
        O: Flatten,
        O::Item: 'static,
        O::IntoIter: 'static,
    {
        let split: fn(O) -> Option<O::IntoIter> = <O as Flatten>::flatten;
        self.typed(Box::new(FlattenNode::new("flat_map", split)))
    }

    /// Unroll a fixed-size sequence element by element.
    pub fn flat_array(self) -> StageRef<'c, I, O::Item>
    where
        O: Sequence,
        O::Item: 'static,
        O::IntoIter: 'static,
    {
        let split: fn(O) -> Option<O::IntoIter> = <O as Elements>::into_elements;
        self.typed(Box::new(FlattenNode::new("flat_array", split)))
    }

    /// Unroll an iterable source element by element.
    pub fn flat_iterable(self) -> StageRef<'c, I, O::Item>
    where
        O: Elements,
        O::Item: 'static,
        O::IntoIter: 'static,
    {
        let split: fn(O) -> Option<O::IntoIter> = <O as Elements>::into_elements;
        self.typed(Box::new(FlattenNode::new("flat_iterable", split)))
    }

    pub fn take(self, count: usize) -> StageRef<'c, I, O> {
        self.add(Take::<O>::new(count))
    }

    /// Tap on the data path: `f` sees every item before it moves on.
    pub fn catch_data<F>(self, f: F) -> StageRef<'c, I, O>
    where
        F: FnMut(&O) + 'static,
    {
        self.typed(Box::new(CatchDataNode::<F, O>::new(f)))
    }

    /// Tap on the error path. The error keeps travelling forward.
    pub fn catch_error<F>(self, f: F) -> StageRef<'c, I, O>
    where
        F: FnMut(&Error) + 'static,
    {
        self.typed(Box::new(CatchErrorNode::new(f)))
    }

    /// Tap on the completion path. Completion keeps travelling forward.
    pub fn catch_complete<F>(self, f: F) -> StageRef<'c, I, O>
    where
        F: FnMut() + 'static,
    {
        self.typed(Box::new(CatchCompleteNode::new(f)))
    }

    /// Terminate the chain with `receiver`.
    pub fn receiver<R: Receiver<O>>(self, receiver: R) -> StageId<()> {
        let chain = self.chain.id;
        let out = self.typed::<()>(Box::new(ReceiverNode::<R, O>::new(receiver)));
        StageId::new(chain, out.key)
    }
}
