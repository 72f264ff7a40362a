use std::any::Any;
use std::marker::PhantomData;

use crate::error::Error;
use crate::pipeline::emit::{reject, unbox, Cursor, Item, Node};

/// map: I -> N
pub(crate) struct MapNode<F, I> {
    f: F,
    _in: PhantomData<fn(I)>,
}

impl<F, I> MapNode<F, I> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, _in: PhantomData }
    }
}

impl<F, I, N> Node for MapNode<F, I>
where
    I: 'static,
    N: 'static,
    F: FnMut(I) -> N + 'static,
{
    fn name(&self) -> &'static str {
        "map"
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let value = unbox::<I>(item, &mut cursor)?;
        Some(Box::new((self.f)(value)))
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) struct FilterNode<P, T> {
    pred: P,
    _in: PhantomData<fn(T)>,
}

impl<P, T> FilterNode<P, T> {
    pub(crate) fn new(pred: P) -> Self {
        Self {
            pred,
            _in: PhantomData,
        }
    }
}

impl<P, T> Node for FilterNode<P, T>
where
    T: 'static,
    P: FnMut(&T) -> bool + 'static,
{
    fn name(&self) -> &'static str {
        "filter"
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let Some(value) = item.downcast_ref::<T>() else {
            reject::<T>(&mut cursor);
            return None;
        };
        if (self.pred)(value) {
            Some(item)
        } else {
            None
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tap on the data path.
pub(crate) struct CatchDataNode<F, T> {
    f: F,
    _in: PhantomData<fn(T)>,
}

impl<F, T> CatchDataNode<F, T> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, _in: PhantomData }
    }
}

impl<F, T> Node for CatchDataNode<F, T>
where
    T: 'static,
    F: FnMut(&T) + 'static,
{
    fn name(&self) -> &'static str {
        "catch_data"
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let Some(value) = item.downcast_ref::<T>() else {
            reject::<T>(&mut cursor);
            return None;
        };
        (self.f)(value);
        Some(item)
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tap on the error path. The item type is irrelevant: data passes through
/// untouched.
pub(crate) struct CatchErrorNode<F> {
    f: F,
}

impl<F> CatchErrorNode<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Node for CatchErrorNode<F>
where
    F: FnMut(&Error) + 'static,
{
    fn name(&self) -> &'static str {
        "catch_error"
    }

    fn receive(&mut self, item: Item, _cursor: Cursor<'_>) -> Option<Item> {
        Some(item)
    }

    fn on_error(&mut self, cause: &Error) {
        (self.f)(cause);
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tap on the completion path.
pub(crate) struct CatchCompleteNode<F> {
    f: F,
}

impl<F> CatchCompleteNode<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Node for CatchCompleteNode<F>
where
    F: FnMut() + 'static,
{
    fn name(&self) -> &'static str {
        "catch_complete"
    }

    fn receive(&mut self, item: Item, _cursor: Cursor<'_>) -> Option<Item> {
        Some(item)
    }

    fn on_complete(&mut self) {
        (self.f)();
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}
