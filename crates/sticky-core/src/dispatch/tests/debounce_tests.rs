use super::*;
use crate::runtime::TestRuntime;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

type Calls<A> = Rc<RefCell<Vec<(u64, A)>>>;

fn recording<A: 'static>(runtime: &TestRuntime) -> (Calls<A>, impl FnMut(A) + 'static) {
    let calls: Calls<A> = Rc::new(RefCell::new(Vec::new()));
    let handle = runtime.handle();
    let sink = calls.clone();
    let action = move |args| {
        let now = handle.now().unwrap_or_default().as_millis() as u64;
        sink.borrow_mut().push((now, args));
    };
    (calls, action)
}

#[test]
fn burst_runs_once_with_last_arguments() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(300), DebounceOptions::default(), action).unwrap();

    let mut outcomes = Vec::new();
    for value in 0..4u32 {
        runtime.advance_to(ms(u64::from(value) * 50));
        outcomes.push(debouncer.invoke(value));
    }
    assert_eq!(
        outcomes,
        vec![
            Invoke::Scheduled,
            Invoke::Coalesced,
            Invoke::Coalesced,
            Invoke::Coalesced
        ]
    );

    runtime.advance_to(ms(449));
    assert!(calls.borrow().is_empty());
    runtime.advance_to(ms(1_000));
    assert_eq!(*calls.borrow(), vec![(450, 3)]);
    assert!(!debouncer.is_pending());
}

#[test]
fn separated_bursts_run_separately() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(300), DebounceOptions::default(), action).unwrap();

    debouncer.invoke("a");
    runtime.advance_to(ms(500));
    assert_eq!(debouncer.invoke("b"), Invoke::Scheduled);
    runtime.advance_to(ms(2_000));

    assert_eq!(*calls.borrow(), vec![(300, "a"), (800, "b")]);
}

#[test]
fn leading_only_runs_immediately_and_never_later() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let options = DebounceOptions::default()
        .with_leading(true)
        .with_trailing(false);
    let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, action).unwrap();

    assert_eq!(debouncer.invoke(1), Invoke::Executed);
    assert_eq!(*calls.borrow(), vec![(0, 1)]);

    runtime.advance_by(ms(500));
    assert_eq!(*calls.borrow(), vec![(0, 1)]);
}

#[test]
fn leading_and_trailing_run_at_both_ends_of_a_burst() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let options = DebounceOptions::default().with_leading(true);
    let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, action).unwrap();

    assert_eq!(debouncer.invoke(0), Invoke::Executed);
    runtime.advance_to(ms(30));
    assert_eq!(debouncer.invoke(1), Invoke::Coalesced);
    runtime.advance_to(ms(60));
    assert_eq!(debouncer.invoke(2), Invoke::Coalesced);
    runtime.advance_to(ms(1_000));

    assert_eq!(*calls.borrow(), vec![(0, 0), (160, 2)]);
}

#[test]
fn lone_call_with_both_edges_runs_once() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let options = DebounceOptions::default().with_leading(true);
    let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, action).unwrap();

    debouncer.invoke(7);
    runtime.advance_by(ms(1_000));

    assert_eq!(*calls.borrow(), vec![(0, 7)]);
}

#[test]
fn max_wait_forces_runs_under_continuous_input() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let options = DebounceOptions::default().with_max_wait(ms(300));
    let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, action).unwrap();

    for value in 0..40u32 {
        debouncer.invoke(value);
        runtime.advance_by(ms(50));
    }
    runtime.advance_by(ms(1_000));

    let calls = calls.borrow();
    assert!(calls.len() >= 6, "expected forced runs, got {calls:?}");
    assert!(calls[0].0 <= 300);
    for pair in calls.windows(2) {
        assert!(
            pair[1].0 - pair[0].0 <= 300,
            "gap between {:?} and {:?} exceeds max_wait",
            pair[0],
            pair[1]
        );
    }
    assert_eq!(calls.last().map(|(_, value)| *value), Some(39));
}

#[test]
fn continuous_input_without_max_wait_runs_only_after_pause() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(100), DebounceOptions::default(), action).unwrap();

    for value in 0..20u32 {
        debouncer.invoke(value);
        runtime.advance_by(ms(50));
    }
    assert!(calls.borrow().is_empty());

    runtime.advance_by(ms(500));
    assert_eq!(*calls.borrow(), vec![(1_050, 19)]);
}

#[test]
fn cancel_drops_pending_run_and_keeps_debouncer_usable() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(100), DebounceOptions::default(), action).unwrap();

    debouncer.invoke(1);
    assert!(debouncer.is_pending());
    debouncer.cancel();
    assert!(!debouncer.is_pending());
    runtime.advance_by(ms(500));
    assert!(calls.borrow().is_empty());

    assert_eq!(debouncer.invoke(2), Invoke::Scheduled);
    runtime.advance_by(ms(500));
    assert_eq!(*calls.borrow(), vec![(600, 2)]);
}

#[test]
fn dispose_is_final_and_idempotent() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(100), DebounceOptions::default(), action).unwrap();

    debouncer.invoke(1);
    debouncer.dispose();
    debouncer.dispose();
    assert!(debouncer.is_disposed());

    runtime.advance_by(ms(500));
    assert_eq!(debouncer.invoke(2), Invoke::Disposed);
    runtime.advance_by(ms(500));
    assert!(calls.borrow().is_empty());
    assert!(!runtime.handle().has_pending_timers());
}

#[test]
fn dropping_debouncer_cancels_pending_run() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(100), DebounceOptions::default(), action).unwrap();

    debouncer.invoke(1);
    drop(debouncer);
    runtime.advance_by(ms(500));

    assert!(calls.borrow().is_empty());
    assert!(!runtime.handle().has_pending_timers());
}

#[test]
fn flush_runs_pending_work_now() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer =
        Debouncer::new(&runtime.handle(), ms(300), DebounceOptions::default(), action).unwrap();

    assert!(!debouncer.flush());
    debouncer.invoke("draft");
    runtime.advance_by(ms(50));
    assert!(debouncer.flush());
    assert!(!debouncer.flush());

    runtime.advance_by(ms(1_000));
    assert_eq!(*calls.borrow(), vec![(50, "draft")]);
}

#[test]
fn rejects_options_without_any_edge() {
    let runtime = TestRuntime::new();
    let options = DebounceOptions::default()
        .with_leading(false)
        .with_trailing(false);
    let result = Debouncer::new(&runtime.handle(), ms(100), options, |_: u32| {});

    assert!(matches!(result, Err(DispatchError::NoEdge)));
}

#[test]
fn max_wait_below_wait_is_raised_to_wait() {
    let runtime = TestRuntime::new();
    let options = DebounceOptions::default().with_max_wait(ms(50));
    let debouncer = Debouncer::new(&runtime.handle(), ms(100), options, |_: u32| {}).unwrap();

    assert_eq!(debouncer.options().max_wait, Some(ms(100)));
    assert_eq!(debouncer.wait(), ms(100));
}

#[test]
fn panicking_action_propagates_and_debouncer_recovers() {
    let runtime = TestRuntime::new();
    let (calls, mut record) = recording(&runtime);
    let debouncer = Debouncer::new(
        &runtime.handle(),
        ms(100),
        DebounceOptions::default(),
        move |value: u32| {
            if value == 1 {
                panic!("action failed");
            }
            record(value);
        },
    )
    .unwrap();

    debouncer.invoke(1);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| runtime.advance_by(ms(200))));
    assert!(outcome.is_err());

    assert_eq!(debouncer.invoke(2), Invoke::Scheduled);
    runtime.advance_by(ms(200));
    assert_eq!(*calls.borrow(), vec![(200, 2)]);
}

#[test]
fn debouncer_on_dropped_runtime_reports_disposed() {
    let runtime = TestRuntime::new();
    let handle = runtime.handle();
    let debouncer = Debouncer::new(&handle, ms(100), DebounceOptions::default(), |_: u32| {})
        .unwrap();
    drop(runtime);

    assert_eq!(debouncer.invoke(1), Invoke::Disposed);
    assert!(!debouncer.flush());
}

#[test]
fn works_behind_dispatch_trait_object() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let dispatcher: Box<dyn Dispatch<u32>> = Box::new(
        Debouncer::new(&runtime.handle(), ms(100), DebounceOptions::default(), action).unwrap(),
    );

    dispatcher.invoke(5);
    runtime.advance_by(ms(100));
    dispatcher.dispose();

    assert!(dispatcher.is_disposed());
    assert_eq!(*calls.borrow(), vec![(100, 5)]);
}

#[test]
fn trailing_constructor_uses_default_edges() {
    let runtime = TestRuntime::new();
    let (calls, action) = recording(&runtime);
    let debouncer = Debouncer::trailing(&runtime.handle(), ms(100), action);

    assert_eq!(debouncer.options(), DebounceOptions::default());
    assert_eq!(debouncer.invoke('x'), Invoke::Scheduled);
    runtime.advance_by(ms(100));

    assert_eq!(*calls.borrow(), vec![(100, 'x')]);
}
