use callchain::prelude::*;

mod common;
use common::{completions, errors, items, sink, Event, VecSource};

#[test]
fn literal_chain_takes_first_two_matches() -> Result<()> {
    let (receiver, events) = sink::<String>();
    let mut chain = Chain::<()>::new();
    chain
        .just_all(vec![-2, -1, 0, 1, 2])?
        .map(|x| x * 2)
        .filter(|x| *x >= 0)
        .map(|x| format!("item {x}"))
        .take(2)
        .receiver(receiver);

    chain.start()?;

    assert_eq!(
        *events.borrow(),
        vec![
            Event::Item("item 0".to_string()),
            Event::Item("item 2".to_string()),
            Event::Complete,
        ]
    );
    // The producer was cut off before its last value.
    assert_eq!(chain.state_at(0), Some(State::Stopped));
    Ok(())
}

#[test]
fn missing_input_to_flat_array_is_an_error() -> Result<()> {
    let (receiver, events) = sink::<i32>();
    let mut chain = Chain::<Option<Vec<i32>>>::new();
    chain.begin()?.flat_array().receiver(receiver);

    chain.run(None)?;

    assert!(items(&events).is_empty());
    assert_eq!(completions(&events), 0);
    assert_eq!(errors(&events), vec!["`flat_array` got no value".to_string()]);
    assert_eq!(chain.states(), vec![State::Errored, State::Errored]);
    Ok(())
}

#[test]
fn empty_chain_refuses_to_run() {
    let mut chain = Chain::<()>::new();
    assert!(matches!(chain.start(), Err(Error::EmptyChain)));
}

#[test]
fn run_pushes_input_into_head() -> Result<()> {
    let (receiver, events) = sink::<String>();
    let mut chain = Chain::<i32>::new();
    chain
        .begin()?
        .map(|x| x + 1)
        .map(|x| x.to_string())
        .receiver(receiver);

    chain.run(41)?;

    assert_eq!(items(&events), vec!["42".to_string()]);
    // Nothing completed: the chain is still open after the push.
    assert_eq!(completions(&events), 0);
    assert!(chain.states().iter().all(|state| *state == State::Active));
    Ok(())
}

#[test]
fn rerun_while_tail_active_is_rejected() -> Result<()> {
    let (receiver, events) = sink::<i32>();
    let mut chain = Chain::<i32>::new();
    chain.begin()?.map(|x| x * 2).receiver(receiver);

    chain.run(1)?;
    assert!(matches!(chain.run(2), Err(Error::Reentrant)));
    assert_eq!(items(&events), vec![2]);

    // Halting the chain finishes the run, so it can start again.
    chain.stop();
    chain.run(3)?;
    assert_eq!(items(&events), vec![2, 6]);
    Ok(())
}

#[test]
fn completed_chain_runs_again_from_scratch() -> Result<()> {
    let (receiver, events) = sink::<i32>();
    let mut chain = Chain::<()>::new();
    chain.just_all(vec![1, 2, 3, 4])?.take(2).receiver(receiver);

    chain.start()?;
    chain.start()?;

    assert_eq!(
        *events.borrow(),
        vec![
            Event::Item(1),
            Event::Item(2),
            Event::Complete,
            Event::Item(1),
            Event::Item(2),
            Event::Complete,
        ]
    );
    Ok(())
}

#[test]
fn states_before_first_run_are_uninitialized() -> Result<()> {
    let mut chain = Chain::<()>::new();
    let id = chain.just(1)?.map(|x| x + 1).id();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.state(id), Some(State::Uninitialized));
    assert_eq!(chain.worker_state(), State::Uninitialized);
    assert!(!chain.can_work(0));
    assert!(!chain.can_work(7));
    Ok(())
}

#[test]
fn custom_stage_emits_many_per_input() -> Result<()> {
    struct Repeat;

    impl Stage<(char, usize)> for Repeat {
        type Out = char;

        fn push(&mut self, (c, n): (char, usize), out: &mut Emitter<'_, char>) {
            for _ in 0..n {
                out.send(c);
            }
        }
    }

    let (receiver, events) = sink::<char>();
    let mut chain = Chain::<(char, usize)>::new();
    chain.add(Repeat)?.receiver(receiver);

    chain.run(('x', 3))?;
    assert_eq!(items(&events), vec!['x', 'x', 'x']);
    Ok(())
}

#[test]
fn custom_stage_error_reaches_receiver_once() -> Result<()> {
    struct Faulty;

    impl Stage<i32> for Faulty {
        type Out = i32;

        fn push(&mut self, item: i32, out: &mut Emitter<'_, i32>) {
            out.send(item);
            let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
            out.fail(Error::stage_source("faulty", io));
            // Everything after the first failure is ignored.
            out.fail(Error::pipeline("second failure"));
            out.send(item + 1);
            out.complete();
        }
    }

    let (receiver, events) = sink::<i32>();
    let mut chain = Chain::<i32>::new();
    let faulty = chain.add(Faulty)?.id();
    chain.tail(faulty)?.receiver(receiver);

    chain.run(7)?;

    assert_eq!(
        *events.borrow(),
        vec![
            Event::Item(7),
            Event::Error("stage `faulty` failed: disk on fire".to_string()),
        ]
    );
    assert_eq!(chain.state(faulty), Some(State::Errored));
    Ok(())
}

#[test]
fn errors_never_reach_earlier_stages() -> Result<()> {
    let early = common::counter();
    let late = common::counter();
    let (receiver, _events) = sink::<i32>();

    let mut chain = Chain::<Option<Vec<i32>>>::new();
    let early_seen = early.clone();
    let late_seen = late.clone();
    chain
        .begin()?
        .catch_error(move |_| *early_seen.borrow_mut() += 1)
        .flat_array()
        .catch_error(move |_| *late_seen.borrow_mut() += 1)
        .receiver(receiver);

    chain.run(None)?;

    assert_eq!(*early.borrow(), 0);
    assert_eq!(*late.borrow(), 1);
    assert_eq!(
        chain.states(),
        vec![State::Active, State::Errored, State::Errored, State::Errored]
    );
    Ok(())
}

#[test]
fn stage_hooks_observe_incoming_signals() -> Result<()> {
    #[derive(Default)]
    struct Observer {
        completed: usize,
        failed: usize,
    }

    impl Stage<i32> for Observer {
        type Out = i32;

        fn push(&mut self, item: i32, out: &mut Emitter<'_, i32>) {
            out.send(item);
        }

        fn on_error(&mut self, _cause: &Error) {
            self.failed += 1;
        }

        fn on_complete(&mut self) {
            self.completed += 1;
        }
    }

    let (receiver, events) = sink::<i32>();
    let mut chain = Chain::<()>::new();
    let observer = chain.just(5)?.add(Observer::default()).id();
    chain.tail(observer)?.receiver(receiver);

    chain.start()?;

    let stage = chain
        .stage_mut::<Observer, _>(observer)
        .expect("observer is attached");
    assert_eq!((stage.completed, stage.failed), (1, 0));
    assert_eq!(*events.borrow(), vec![Event::Item(5), Event::Complete]);
    Ok(())
}

#[test]
fn appending_after_receiver_fails() -> Result<()> {
    let (receiver, _) = sink::<i32>();
    let (second, _) = sink::<i32>();
    let mut chain = Chain::<i32>::new();
    chain.begin()?.receiver(receiver);

    assert!(matches!(
        chain.receiver(second),
        Err(Error::TerminalAppend { stage: "collect_sink" })
    ));
    assert!(matches!(chain.just(1), Err(Error::TerminalAppend { .. })));
    assert!(matches!(chain.begin(), Err(Error::TerminalAppend { .. })));
    Ok(())
}

#[test]
fn appending_a_stage_of_the_wrong_type_fails() {
    let mut chain = Chain::<i32>::new();
    let err = chain.add(Take::<String>::new(1)).err();

    match err {
        Some(Error::TypeMismatch { expected, found }) => {
            assert_eq!(expected, "i32");
            assert_eq!(found, std::any::type_name::<String>());
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
    assert!(chain.is_empty());
}

#[test]
fn tail_only_reopens_the_last_stage() -> Result<()> {
    let mut chain = Chain::<i32>::new();
    let first = chain.begin()?.map(|x| x + 1).id();
    let second = chain.tail(first)?.map(|x| x * 2).id();

    assert!(matches!(chain.tail(first), Err(Error::NotTail { index: 0 })));
    assert!(chain.tail(second).is_ok());

    let mut other_chain = Chain::<i32>::new();
    let other = other_chain.begin()?.id();
    assert!(matches!(chain.tail(other), Err(Error::UnknownStage)));
    Ok(())
}

#[test]
fn long_chains_forward_without_deep_recursion() -> Result<()> {
    let (receiver, events) = sink::<u64>();
    let mut chain = Chain::<u64>::new();
    let mut stage = chain.begin()?;
    for _ in 0..10_000 {
        stage = stage.map(|x| x + 1);
    }
    stage.receiver(receiver);

    chain.run(0)?;
    assert_eq!(items(&events), vec![10_000]);
    Ok(())
}

#[test]
fn large_producers_stream_through() -> Result<()> {
    let (receiver, events) = sink::<usize>();
    let mut chain = Chain::<()>::new();
    chain
        .add_producer(VecSource::new((0..100_000).collect()))?
        .filter(|x| x % 1_000 == 0)
        .map(|x| x / 1_000)
        .receiver(receiver);

    chain.start()?;

    assert_eq!(items(&events), (0..100).collect::<Vec<_>>());
    assert_eq!(completions(&events), 1);
    Ok(())
}

#[test]
fn named_chain_shows_up_in_debug() -> Result<()> {
    let mut chain = Chain::<i32>::with_config(ChainConfig::new().name("ingest").trace_items(true));
    chain.begin()?.take(1);

    assert_eq!(chain.config().chain_name(), "ingest");
    let debug = format!("{chain:?}");
    assert!(debug.contains("ingest"), "{debug}");
    assert!(debug.contains("take"), "{debug}");
    Ok(())
}
