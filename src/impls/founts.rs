//! Fount implementations.
//!
//! This module provides concrete founts that push data into processing
//! pipelines while honoring downstream pause/resume signals.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::Result;
use crate::kind::Kind;
use crate::traits::{DrainRef, Fount};

/// A fount that pushes items from any iterator.
///
/// Once attached, the fount drives its drain until the iterator is
/// exhausted or the drain asks it to pause; each resume edge picks the
/// iteration back up where it stopped.
pub struct IterFount<I: Iterator> {
    state: Rc<IterFountState<I>>,
}

struct IterFountState<I: Iterator> {
    iter: RefCell<I>,
    drain: RefCell<Option<DrainRef<I::Item>>>,
    kind: Cell<Option<Kind>>,
    paused: Cell<bool>,
    /// Re-entrancy guard for the delivery loop.
    pumping: Cell<bool>,
}

impl<I: Iterator> Clone for IterFount<I> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<I: Iterator> IterFount<I> {
    /// Create a fount over `iter`.
    pub fn new(iter: I) -> Self {
        Self {
            state: Rc::new(IterFountState {
                iter: RefCell::new(iter),
                drain: RefCell::new(None),
                kind: Cell::new(None),
                paused: Cell::new(false),
                pumping: Cell::new(false),
            }),
        }
    }

    /// Advertise an output kind for downstream validation.
    pub fn with_kind(self, kind: Kind) -> Self {
        self.state.kind.set(Some(kind));
        self
    }

    /// Deliver items until paused, exhausted, or detached.
    fn run(&self) {
        let s = &*self.state;
        if s.pumping.get() {
            return;
        }
        s.pumping.set(true);
        while !s.paused.get() {
            let drain = s.drain.borrow().clone();
            let Some(drain) = drain else { break };
            let item = s.iter.borrow_mut().next();
            let Some(item) = item else { break };
            drain.receive(item);
        }
        s.pumping.set(false);
    }
}

impl<I> Fount for IterFount<I>
where
    I: Iterator + 'static,
    I::Item: 'static,
{
    type Item = I::Item;

    fn output_kind(&self) -> Option<Kind> {
        self.state.kind.get()
    }

    fn attach(&self, drain: DrainRef<I::Item>) -> Result<()> {
        drain.flowing_from(Rc::new(self.clone()))?;
        *self.state.drain.borrow_mut() = Some(drain);
        self.run();
        Ok(())
    }

    fn pause_flow(&self) {
        self.state.paused.set(true);
    }

    fn resume_flow(&self) {
        if self.state.paused.replace(false) {
            self.run();
        }
    }

    fn flow_is_paused(&self) -> bool {
        self.state.paused.get()
    }
}
