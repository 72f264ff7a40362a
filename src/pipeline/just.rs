use crate::pipeline::emit::Emitter;
use crate::pipeline::stage::Stage;

type IterFactory<T> = Box<dyn Fn() -> Box<dyn Iterator<Item = T>>>;

enum Payload<T> {
    Value(T),
    Sequence(Vec<T>),
    Iterable(IterFactory<T>),
}

/// Emits a literal payload, ignoring whatever it is pushed, then completes.
///
/// Works both as the head of a chain (see
/// [`Chain::just`](crate::pipeline::chain::Chain::just)) and as a reusable
/// producer for [`Chain::run_worker`](crate::pipeline::chain::Chain::run_worker).
/// The payload is fixed at construction and re-emitted on every run.
pub struct Just<T> {
    payload: Payload<T>,
}

impl<T: Clone + 'static> Just<T> {
    /// Emit a single value.
    pub fn value(value: T) -> Self {
        Self {
            payload: Payload::Value(value),
        }
    }

    /// Emit every element of a fixed sequence, in order.
    pub fn all(values: impl Into<Vec<T>>) -> Self {
        Self {
            payload: Payload::Sequence(values.into()),
        }
    }

    /// Emit every element of an iterable source. The source is cloned for
    /// each run.
    pub fn iter<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + 'static,
        I::IntoIter: 'static,
    {
        let factory = move || -> Box<dyn Iterator<Item = T>> { Box::new(source.clone().into_iter()) };
        Self {
            payload: Payload::Iterable(Box::new(factory)),
        }
    }
}

impl<T: Clone + 'static> Stage<()> for Just<T> {
    type Out = T;

    fn push(&mut self, _item: (), out: &mut Emitter<'_, T>) {
        if !out.can_work() {
            return;
        }

        match &self.payload {
            Payload::Value(value) => out.send(value.clone()),
            Payload::Sequence(values) => {
                for value in values {
                    if !out.can_work() {
                        break;
                    }
                    out.send(value.clone());
                }
            }
            Payload::Iterable(factory) => {
                for value in factory() {
                    if !out.can_work() {
                        break;
                    }
                    out.send(value);
                }
            }
        }

        out.complete();
    }

    fn stage_name(&self) -> &'static str {
        "just"
    }
}

impl<T> std::fmt::Debug for Just<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.payload {
            Payload::Value(_) => "value",
            Payload::Sequence(_) => "sequence",
            Payload::Iterable(_) => "iterable",
        };
        f.debug_struct("Just").field("payload", &kind).finish()
    }
}
