use std::marker::PhantomData;

use crate::pipeline::emit::Emitter;
use crate::pipeline::stage::Stage;

/// Lets the first `count` items through, then stops every earlier stage and
/// completes.
///
/// The item that reaches the limit is forwarded before the stop request and
/// the completion signal, all within the same push.
pub struct Take<T> {
    count: usize,
    counter: usize,
    _item: PhantomData<fn(T)>,
}

impl<T> Take<T> {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            counter: 0,
            _item: PhantomData,
        }
    }

    /// Change the limit after the stage was attached. Applies from the next
    /// received item on.
    pub fn set_count(&mut self, count: usize) -> &mut Self {
        self.count = count;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Items received during the current run.
    pub fn received(&self) -> usize {
        self.counter
    }
}

impl<T: 'static> Stage<T> for Take<T> {
    type Out = T;

    fn push(&mut self, item: T, out: &mut Emitter<'_, T>) {
        if !out.can_work() {
            return;
        }

        self.counter += 1;

        if self.counter <= self.count {
            out.send(item);
        }

        if self.counter >= self.count {
            out.request_stop_upstream();
            out.complete();
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
    }

    fn stage_name(&self) -> &'static str {
        "take"
    }
}

impl<T> std::fmt::Debug for Take<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Take")
            .field("count", &self.count)
            .field("counter", &self.counter)
            .finish()
    }
}
