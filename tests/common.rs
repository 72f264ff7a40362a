#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use callchain::prelude::*;

/// Producer that emits a fixed list, honouring stop requests, then completes.
#[derive(Clone)]
pub struct VecSource<T> {
    items: Vec<T>,
    complete: bool,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            complete: true,
        }
    }

    /// Leave the chain running after the last item.
    pub fn open_ended(mut self) -> Self {
        self.complete = false;
        self
    }
}

impl<T: Clone + 'static> Stage<()> for VecSource<T> {
    type Out = T;

    fn push(&mut self, _item: (), out: &mut Emitter<'_, T>) {
        for item in self.items.clone() {
            if !out.can_work() {
                break;
            }
            out.send(item);
        }
        if self.complete {
            out.complete();
        }
    }

    fn stage_name(&self) -> &'static str {
        "vec_source"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Item(T),
    Error(String),
    Complete,
}

/// Receiver that records everything reaching the end of a chain.
pub struct CollectSink<T> {
    out: Rc<RefCell<Vec<Event<T>>>>,
}

impl<T> CollectSink<T> {
    pub fn new(out: Rc<RefCell<Vec<Event<T>>>>) -> Self {
        Self { out }
    }
}

impl<T: 'static> Receiver<T> for CollectSink<T> {
    fn on_receive(&mut self, item: T) {
        self.out.borrow_mut().push(Event::Item(item));
    }

    fn on_error(&mut self, cause: &Error) {
        self.out.borrow_mut().push(Event::Error(cause.to_string()));
    }

    fn on_complete(&mut self) {
        self.out.borrow_mut().push(Event::Complete);
    }

    fn receiver_name(&self) -> &'static str {
        "collect_sink"
    }
}

pub type Events<T> = Rc<RefCell<Vec<Event<T>>>>;

pub fn sink<T>() -> (CollectSink<T>, Events<T>) {
    let out = Rc::new(RefCell::new(Vec::new()));
    (CollectSink::new(out.clone()), out)
}

pub fn items<T: Clone>(events: &Events<T>) -> Vec<T> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Item(item) => Some(item.clone()),
            _ => None,
        })
        .collect()
}

pub fn errors<T>(events: &Events<T>) -> Vec<String> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Error(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn completions<T>(events: &Events<T>) -> usize {
    events
        .borrow()
        .iter()
        .filter(|event| matches!(event, Event::Complete))
        .count()
}

/// Shared counter for closures handed to taps.
pub fn counter() -> Rc<RefCell<usize>> {
    Rc::new(RefCell::new(0))
}
