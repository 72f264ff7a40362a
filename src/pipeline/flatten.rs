//! Unrolling collections into single items.
//!
//! The shape of a value is decided by its type when the chain is built:
//! [`Sequence`] for fixed-size sequences, [`Elements`] for any iterable
//! source and [`Flatten`] for `flat_map`, which also lets scalars through as
//! a single item. `Option<_>` models a source that may be absent; `None`
//! reaches the flatten stage as a missing value and is signalled as an error.

use std::any::Any;
use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::marker::PhantomData;
use std::ops::{Range, RangeInclusive};

use crate::error::Error;
use crate::pipeline::emit::{unbox, Cursor, Item, Node};

/// An iterable source of items.
pub trait Elements {
    type Item;
    type IntoIter: Iterator<Item = Self::Item>;

    /// `None` when the source itself is missing.
    fn into_elements(self) -> Option<Self::IntoIter>;
}

/// A fixed-size sequence, accepted by `flat_array`.
pub trait Sequence: Elements {}

/// Anything `flat_map` can unroll: every [`Elements`] source, plus scalars
/// that pass through unchanged.
pub trait Flatten {
    type Item;
    type IntoIter: Iterator<Item = Self::Item>;

    fn flatten(self) -> Option<Self::IntoIter>;
}

impl<E: Elements> Flatten for E {
    type Item = E::Item;
    type IntoIter = E::IntoIter;

    fn flatten(self) -> Option<Self::IntoIter> {
        self.into_elements()
    }
}

macro_rules! scalar_flatten {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Flatten for $ty {
                type Item = $ty;
                type IntoIter = std::iter::Once<$ty>;

                fn flatten(self) -> Option<Self::IntoIter> {
                    Some(std::iter::once(self))
                }
            }
        )*
    };
}

scalar_flatten!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

macro_rules! owned_elements {
    ($($container:ident),* $(,)?) => {
        $(
            impl<T> Elements for $container<T> {
                type Item = T;
                type IntoIter = <$container<T> as IntoIterator>::IntoIter;

                fn into_elements(self) -> Option<Self::IntoIter> {
                    Some(self.into_iter())
                }
            }
        )*
    };
}

owned_elements!(Vec, VecDeque, LinkedList, BTreeSet, HashSet);

impl<T> Sequence for Vec<T> {}
impl<T> Sequence for VecDeque<T> {}

impl<T> Elements for Box<[T]> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_elements(self) -> Option<Self::IntoIter> {
        Some(self.into_vec().into_iter())
    }
}

impl<T> Sequence for Box<[T]> {}

impl<T, const N: usize> Elements for [T; N] {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, N>;

    fn into_elements(self) -> Option<Self::IntoIter> {
        Some(self.into_iter())
    }
}

impl<T, const N: usize> Sequence for [T; N] {}

impl<A> Elements for Range<A>
where
    Range<A>: Iterator<Item = A>,
{
    type Item = A;
    type IntoIter = Range<A>;

    fn into_elements(self) -> Option<Self::IntoIter> {
        Some(self)
    }
}

impl<A> Elements for RangeInclusive<A>
where
    RangeInclusive<A>: Iterator<Item = A>,
{
    type Item = A;
    type IntoIter = RangeInclusive<A>;

    fn into_elements(self) -> Option<Self::IntoIter> {
        Some(self)
    }
}

impl<E: Elements> Elements for Option<E> {
    type Item = E::Item;
    type IntoIter = E::IntoIter;

    fn into_elements(self) -> Option<Self::IntoIter> {
        self.and_then(Elements::into_elements)
    }
}

impl<S: Sequence> Sequence for Option<S> {}

/// Adapts any [`IntoIterator`] into an [`Elements`] source.
#[derive(Debug, Clone)]
pub struct Iter<I>(pub I);

impl<I: IntoIterator> Elements for Iter<I> {
    type Item = I::Item;
    type IntoIter = I::IntoIter;

    fn into_elements(self) -> Option<Self::IntoIter> {
        Some(self.0.into_iter())
    }
}

/// Unrolls every received value with `split`, checking before each element
/// that the stage may still emit.
pub(crate) struct FlattenNode<P, It> {
    name: &'static str,
    split: fn(P) -> Option<It>,
    _in: PhantomData<fn(P)>,
}

impl<P, It> FlattenNode<P, It> {
    pub(crate) fn new(name: &'static str, split: fn(P) -> Option<It>) -> Self {
        Self {
            name,
            split,
            _in: PhantomData,
        }
    }
}

impl<P, It> Node for FlattenNode<P, It>
where
    P: 'static,
    It: Iterator + 'static,
    It::Item: 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn receive(&mut self, item: Item, mut cursor: Cursor<'_>) -> Option<Item> {
        let value = unbox::<P>(item, &mut cursor)?;
        let Some(elements) = (self.split)(value) else {
            cursor.fail(Error::missing(self.name));
            return None;
        };
        for element in elements {
            if !cursor.can_work() {
                break;
            }
            cursor.send(Box::new(element));
        }
        None
    }

    fn inner_mut(&mut self) -> &mut dyn Any {
        self
    }
}
