//! Integration tests for the siphon flow-control protocol.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use siphon::prelude::*;

/// A hand-driven fount that records pause/resume edges and panics on the
/// redundant signals a well-behaved tube must never send.
struct TestFount<T> {
    state: Rc<TestFountState<T>>,
}

struct TestFountState<T> {
    drain: RefCell<Option<DrainRef<T>>>,
    kind: Cell<Option<Kind>>,
    paused: Cell<bool>,
    pauses: Cell<usize>,
    resumes: Cell<usize>,
}

impl<T> Clone for TestFount<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> TestFount<T> {
    fn new() -> Self {
        Self {
            state: Rc::new(TestFountState {
                drain: RefCell::new(None),
                kind: Cell::new(None),
                paused: Cell::new(false),
                pauses: Cell::new(0),
                resumes: Cell::new(0),
            }),
        }
    }

    fn with_kind(self, kind: Kind) -> Self {
        self.state.kind.set(Some(kind));
        self
    }

    fn is_attached(&self) -> bool {
        self.state.drain.borrow().is_some()
    }

    fn pauses(&self) -> usize {
        self.state.pauses.get()
    }

    fn resumes(&self) -> usize {
        self.state.resumes.get()
    }

    /// Push one item into the attached drain.
    fn send(&self, item: T) -> Progress {
        let drain = self
            .state
            .drain
            .borrow()
            .clone()
            .expect("fount not attached");
        drain.receive(item)
    }
}

impl<T: 'static> Fount for TestFount<T> {
    type Item = T;

    fn output_kind(&self) -> Option<Kind> {
        self.state.kind.get()
    }

    fn attach(&self, drain: DrainRef<T>) -> Result<()> {
        drain.flowing_from(Rc::new(self.clone()))?;
        *self.state.drain.borrow_mut() = Some(drain);
        Ok(())
    }

    fn pause_flow(&self) {
        assert!(!self.state.paused.get(), "pause while already paused");
        self.state.paused.set(true);
        self.state.pauses.set(self.state.pauses.get() + 1);
    }

    fn resume_flow(&self) {
        assert!(self.state.paused.get(), "resume while not paused");
        self.state.paused.set(false);
        self.state.resumes.set(self.state.resumes.get() + 1);
    }

    fn flow_is_paused(&self) -> bool {
        self.state.paused.get()
    }
}

/// A terminal drain recording every item and progress signal it sees.
struct TestDrain<T> {
    state: Rc<TestDrainState<T>>,
}

struct TestDrainState<T> {
    received: RefCell<Vec<T>>,
    progressed: RefCell<Vec<Option<Progress>>>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<T> Clone for TestDrain<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> TestDrain<T> {
    fn new() -> Self {
        Self {
            state: Rc::new(TestDrainState {
                received: RefCell::new(Vec::new()),
                progressed: RefCell::new(Vec::new()),
                fount: RefCell::new(None),
            }),
        }
    }

    fn received(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.received.borrow().clone()
    }

    fn progressed(&self) -> Vec<Option<Progress>> {
        self.state.progressed.borrow().clone()
    }

    fn has_fount(&self) -> bool {
        self.state.fount.borrow().is_some()
    }
}

impl<T: 'static> Drain for TestDrain<T> {
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, item: T) -> Progress {
        self.state.received.borrow_mut().push(item);
        Progress::default()
    }

    fn progress(&self, amount: Option<Progress>) {
        self.state.progressed.borrow_mut().push(amount);
    }
}

impl<T: 'static> Chainable for TestDrain<T> {
    type Next = ();

    fn continuation(&self) {}
}

/// A pump that records what it receives and delivers nothing.
struct RecordPump<T> {
    got: Rc<RefCell<Vec<T>>>,
    result: Option<Progress>,
}

impl<T: 'static> Pump for RecordPump<T> {
    type Input = T;
    type Output = T;

    fn received(&mut self, item: T, _tube: &Tube<T, T>) -> Option<Progress> {
        self.got.borrow_mut().push(item);
        self.result
    }
}

fn record_pump<T>() -> (RecordPump<T>, Rc<RefCell<Vec<T>>>) {
    record_pump_returning(None)
}

fn record_pump_returning<T>(result: Option<Progress>) -> (RecordPump<T>, Rc<RefCell<Vec<T>>>) {
    let got = Rc::new(RefCell::new(Vec::new()));
    (
        RecordPump {
            got: Rc::clone(&got),
            result,
        },
        got,
    )
}

/// A pump that records `progressed` calls and consumes items silently.
struct ProgressPump<T> {
    seen: Rc<RefCell<Vec<Option<Progress>>>>,
    _phantom: PhantomData<T>,
}

impl<T> ProgressPump<T> {
    fn new(seen: Rc<RefCell<Vec<Option<Progress>>>>) -> Self {
        Self {
            seen,
            _phantom: PhantomData,
        }
    }
}

impl<T: 'static> Pump for ProgressPump<T> {
    type Input = T;
    type Output = T;

    fn received(&mut self, _item: T, _tube: &Tube<T, T>) -> Option<Progress> {
        None
    }

    fn progressed(&mut self, amount: Option<Progress>) {
        self.seen.borrow_mut().push(amount);
    }
}

/// A pump that greets its downstream as soon as one connects.
struct StarterPump;

impl Pump for StarterPump {
    type Input = &'static str;
    type Output = &'static str;

    fn started(&mut self, tube: &Tube<&'static str, &'static str>) {
        tube.deliver("greeting");
    }

    fn received(
        &mut self,
        item: &'static str,
        tube: &Tube<&'static str, &'static str>,
    ) -> Option<Progress> {
        tube.deliver(item);
        None
    }
}

/// An echoing pump that requires a specific input kind.
struct KindedPump {
    required: Kind,
}

impl Pump for KindedPump {
    type Input = &'static str;
    type Output = &'static str;

    fn input_kind(&self) -> Option<Kind> {
        Some(self.required)
    }

    fn received(
        &mut self,
        item: &'static str,
        tube: &Tube<&'static str, &'static str>,
    ) -> Option<Progress> {
        tube.deliver(item);
        None
    }
}

#[test]
fn test_receive_substitutes_default_progress() {
    let (pump, got) = record_pump();
    let tube = Tube::new(pump);

    let result = tube.drain().receive("sample item");

    assert_eq!(result, Progress::default());
    assert_eq!(*got.borrow(), vec!["sample item"]);
}

#[test]
fn test_receive_relays_pump_progress() {
    let (pump, got) = record_pump_returning(Some(Progress::new(0.8)));
    let tube = Tube::new(pump);

    let result = tube.drain().receive("some input");

    assert_eq!(result, Progress::new(0.8));
    assert_eq!(*got.borrow(), vec!["some input"]);
}

#[test]
fn test_receive_does_not_pause_upstream() {
    // Only `deliver` has to buffer; input handed straight to the pump
    // never does, so it never costs a pause.
    let ff = TestFount::new();
    let (pump, got) = record_pump::<i64>();
    let tube = Tube::new(pump);
    ff.flow_to(&tube.drain()).unwrap();

    ff.send(3);

    assert_eq!(*got.borrow(), vec![3]);
    assert!(!ff.flow_is_paused());
}

#[test]
fn test_set_pump_transfers_ownership_exclusively() {
    let (first, first_got) = record_pump::<i64>();
    let tube = Tube::new(first);
    let (second, second_got) = record_pump::<i64>();

    let _previous = tube.set_pump(second);
    tube.drain().receive(7);

    assert!(first_got.borrow().is_empty());
    assert_eq!(*second_got.borrow(), vec![7]);
}

#[test]
fn test_started_fires_on_downstream_attach() {
    let ff = TestFount::new();
    let tube = Tube::new(StarterPump);
    let fd = TestDrain::new();

    ff.flow_to(&tube.drain()).unwrap().flow_to(&fd).unwrap();

    assert_eq!(fd.received(), vec!["greeting"]);
}

#[test]
fn test_started_refires_for_replacement_pump() {
    let tube: Tube<&'static str, &'static str> = Tube::new(IdentityPump::new());
    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();
    assert!(fd.received().is_empty());

    tube.set_pump(StarterPump);

    assert_eq!(fd.received(), vec!["greeting"]);
}

#[test]
fn test_flow_to_returns_continuation_for_chaining() {
    let ff = TestFount::new();
    let tube = Tube::new(IdentityPump::<i64>::new());
    let fd = TestDrain::new();

    ff.flow_to(&tube.drain()).unwrap().flow_to(&fd).unwrap();

    assert!(fd.has_fount());
    ff.send(3);
    assert_eq!(fd.received(), vec![3]);
}

#[test]
fn test_downstream_first_wiring() {
    let tube = Tube::new(IdentityPump::<i64>::new());
    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();

    let ff = TestFount::new();
    ff.flow_to(&tube.drain()).unwrap();
    ff.send(3);

    assert_eq!(fd.received(), vec![3]);
}

#[test]
fn test_progress_relays_to_pump_and_downstream() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let tube = Tube::new(ProgressPump::<i64>::new(Rc::clone(&seen)));
    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();

    tube.drain().progress(None);
    tube.drain().progress(Some(Progress::new(0.6)));

    assert_eq!(*seen.borrow(), vec![None, Some(Progress::new(0.6))]);
    assert_eq!(fd.progressed(), vec![None, Some(Progress::new(0.6))]);
}

#[test]
fn test_receive_without_deliver_relays_progress_downstream() {
    let (pump, _got) = record_pump::<i64>();
    let tube = Tube::new(pump);
    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();

    tube.drain().receive(2);

    assert!(fd.received().is_empty());
    assert_eq!(fd.progressed(), vec![None]);
}

#[test]
fn test_progress_reaches_downstream_pump() {
    let (pump, _got) = record_pump::<i64>();
    let front = Tube::new(pump);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let back = Tube::new(ProgressPump::<i64>::new(Rc::clone(&seen)));
    front.fount().flow_to(&back.drain()).unwrap();

    front.drain().receive(2);

    assert_eq!(*seen.borrow(), vec![None]);
}

#[test]
fn test_receive_with_deliver_skips_redundant_progress() {
    let tube = Tube::new(MapPump::new(|x: i64| x + 1));
    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();

    tube.drain().receive(2);

    assert_eq!(fd.received(), vec![3]);
    assert!(fd.progressed().is_empty());
}

#[test]
fn test_deliver_posts_downstream() {
    let ff = TestFount::new();
    let tube = Tube::new(IdentityPump::<i64>::new());
    let fd = TestDrain::new();
    ff.flow_to(&tube.drain()).unwrap().flow_to(&fd).unwrap();

    tube.deliver(7);

    assert_eq!(fd.received(), vec![7]);
    assert!(!ff.flow_is_paused());
}

#[test]
fn test_deliver_buffers_until_downstream_attaches() {
    let tube = Tube::new(IdentityPump::<&'static str>::new());
    tube.deliver("hi");

    // A fount attached while output is already pending gets paused on the
    // spot: it must not add to the backlog.
    let ff = TestFount::new();
    let next = ff.flow_to(&tube.drain()).unwrap();
    assert!(ff.flow_is_paused());

    let fd = TestDrain::new();
    next.flow_to(&fd).unwrap();

    assert_eq!(fd.received(), vec!["hi"]);
    assert!(!ff.flow_is_paused());
    assert_eq!(ff.pauses(), 1);
    assert_eq!(ff.resumes(), 1);
}

#[test]
fn test_deliver_without_downstream_pauses_upstream_once() {
    let ff = TestFount::new();
    let tube = Tube::new(IdentityPump::<&'static str>::new());
    let next = ff.flow_to(&tube.drain()).unwrap();
    assert!(!ff.flow_is_paused());

    tube.deliver("abc");
    assert!(ff.flow_is_paused());

    // Further buffered deliveries must not pause again; TestFount panics
    // if they do.
    tube.deliver("def");
    assert_eq!(ff.pauses(), 1);

    let fd = TestDrain::new();
    next.flow_to(&fd).unwrap();

    assert_eq!(fd.received(), vec!["abc", "def"]);
    assert!(!ff.flow_is_paused());
    assert_eq!(ff.resumes(), 1);
}

#[test]
fn test_pause_mid_unbuffer_stops_and_keeps_upstream_paused() {
    let ff = TestFount::new();
    let tube = Tube::new(IdentityPump::<i64>::new());
    let next = ff.flow_to(&tube.drain()).unwrap();

    tube.deliver(1);
    tube.deliver(2);
    tube.deliver(3);
    assert!(ff.flow_is_paused());

    let sd = StepDrain::new();
    next.flow_to(&sd).unwrap();

    // The drain paused us after one item; the rest stay queued and the
    // upstream fount stays paused.
    assert_eq!(sd.received(), vec![1]);
    assert!(ff.flow_is_paused());
    assert_eq!(ff.resumes(), 0);

    sd.step();
    assert_eq!(sd.received(), vec![1, 2]);
    assert!(ff.flow_is_paused());

    sd.step();
    assert_eq!(sd.received(), vec![1, 2, 3]);
    assert!(!ff.flow_is_paused());
    assert_eq!(ff.pauses(), 1);
    assert_eq!(ff.resumes(), 1);
}

#[test]
fn test_order_preserved_across_buffered_and_immediate_paths() {
    let tube = Tube::new(IdentityPump::<i64>::new());
    tube.deliver(1);
    tube.deliver(2);

    let fd = TestDrain::new();
    tube.fount().flow_to(&fd).unwrap();
    tube.deliver(3);

    assert_eq!(fd.received(), vec![1, 2, 3]);
}

#[test]
fn test_replacing_downstream_drain() {
    let tube = Tube::new(IdentityPump::<i64>::new());
    let first = TestDrain::new();
    let second = TestDrain::new();

    tube.fount().flow_to(&first).unwrap();
    tube.deliver(1);
    tube.fount().flow_to(&second).unwrap();
    tube.deliver(2);

    assert_eq!(first.received(), vec![1]);
    assert_eq!(second.received(), vec![2]);
}

#[test]
fn test_kind_mismatch_rejects_attachment() {
    let ff = TestFount::new().with_kind(Kind::new("raw-bytes"));
    let tube = Tube::new(KindedPump {
        required: Kind::new("parsed-lines"),
    });

    let err = ff.flow_to(&tube.drain()).unwrap_err();

    assert_eq!(
        err,
        Error::KindMismatch {
            offered: Kind::new("raw-bytes"),
            required: Kind::new("parsed-lines"),
        }
    );
    // Nothing was recorded on either side.
    assert!(!ff.is_attached());
    tube.deliver("x");
    assert!(!ff.flow_is_paused());
}

#[test]
fn test_kind_match_attaches() {
    let ff = TestFount::new().with_kind(Kind::new("parsed-lines"));
    let tube = Tube::new(KindedPump {
        required: Kind::new("parsed-lines"),
    });

    ff.flow_to(&tube.drain()).unwrap();

    assert!(ff.is_attached());
}

#[test]
fn test_kind_silent_fount_is_not_checked() {
    // The check only fires when both ends declare a kind.
    let ff = TestFount::new();
    let tube = Tube::new(KindedPump {
        required: Kind::new("parsed-lines"),
    });

    ff.flow_to(&tube.drain()).unwrap();

    assert!(ff.is_attached());
}

#[test]
fn test_kind_registry_allows_provided_capability() {
    let mut registry = KindRegistry::new();
    registry.register(Kind::new("utf8-lines"), Kind::new("lines"));

    let tube = Tube::with_query(
        KindedPump {
            required: Kind::new("lines"),
        },
        registry,
    );
    let ff = TestFount::new().with_kind(Kind::new("utf8-lines"));

    ff.flow_to(&tube.drain()).unwrap();

    assert!(ff.is_attached());
}

#[test]
fn test_echo_scenario() {
    let ff = TestFount::new();
    let tube = Tube::new(IdentityPump::<&'static str>::new());
    let fd = TestDrain::new();
    ff.flow_to(&tube.drain()).unwrap().flow_to(&fd).unwrap();

    let result = ff.send("x");

    assert_eq!(fd.received(), vec!["x"]);
    assert_eq!(result, Progress::default());
}

#[test]
fn test_multi_stage_surfaces_in_order() {
    let a = Tube::new(IdentityPump::<i64>::new());
    let b = Tube::new(IdentityPump::<i64>::new());
    let pipeline = Pipeline::from_tube(&a).then_tube(&b).unwrap();

    let ff = TestFount::new();
    let fd = TestDrain::new();
    ff.flow_to(&pipeline).unwrap().flow_to(&fd).unwrap();

    a.deliver(3);
    b.deliver(4);

    assert_eq!(fd.received(), vec![3, 4]);
}

#[test]
fn test_pipeline_of_pumps_chains_transformations() {
    let pipeline = Pipeline::new(MapPump::new(|x: i64| x * 2))
        .then(MapPump::new(|x: i64| x + 1))
        .unwrap();

    let ff = TestFount::new();
    let fd = TestDrain::new();
    ff.flow_to(&pipeline).unwrap().flow_to(&fd).unwrap();

    ff.send(5);

    assert_eq!(fd.received(), vec![11]);
}

#[test]
fn test_iter_fount_end_to_end_backpressure() {
    let fount = IterFount::new(1..=5i64);
    let tube = Tube::new(MapPump::new(|x: i64| x * 10));
    let sd = StepDrain::new();

    fount.flow_to(&tube.drain()).unwrap().flow_to(&sd).unwrap();

    // The drain admits one item at a time; the fount ends up paused with
    // the overflow parked in the tube.
    assert_eq!(sd.received(), vec![10]);
    assert!(fount.flow_is_paused());

    for _ in 0..10 {
        sd.step();
    }

    assert_eq!(sd.received(), vec![10, 20, 30, 40, 50]);
    assert!(!fount.flow_is_paused());
}

#[test]
fn test_fount_direct_to_drain() {
    let fount = IterFount::new(0..10i64);
    let counter = CountDrain::new();

    fount.flow_to(&counter).unwrap();

    assert_eq!(counter.count(), 10);
}

#[test]
fn test_from_fn_helpers() {
    let collected = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&collected);

    let fount = fount_from_fn({
        let mut n = 0i64;
        move || {
            n += 1;
            (n <= 3).then_some(n)
        }
    });
    let tube = Tube::new(pump_from_fn(|x: i64| vec![x, x]));
    let drain = drain_from_fn(move |item: i64| sink.borrow_mut().push(item));

    fount.flow_to(&tube.drain()).unwrap().flow_to(&drain).unwrap();

    assert_eq!(*collected.borrow(), vec![1, 1, 2, 2, 3, 3]);
}
