//! Drain implementations.
//!
//! This module provides concrete drains that terminate processing
//! pipelines.

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use crate::error::Result;
use crate::traits::{Chainable, Drain, FountRef, Progress};

/// A drain that collects items into a vector.
pub struct CollectDrain<T> {
    state: Rc<CollectState<T>>,
}

struct CollectState<T> {
    items: RefCell<Vec<T>>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<T> Clone for CollectDrain<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> CollectDrain<T> {
    /// Create a new collect drain.
    pub fn new() -> Self {
        Self {
            state: Rc::new(CollectState {
                items: RefCell::new(Vec::new()),
                fount: RefCell::new(None),
            }),
        }
    }

    /// A snapshot of the collected items.
    pub fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.items.borrow().clone()
    }

    /// Remove and return everything collected so far.
    pub fn take_items(&self) -> Vec<T> {
        std::mem::take(&mut *self.state.items.borrow_mut())
    }

    /// The number of items collected.
    pub fn len(&self) -> usize {
        self.state.items.borrow().len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.state.items.borrow().is_empty()
    }
}

impl<T> Default for CollectDrain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drain for CollectDrain<T> {
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, item: T) -> Progress {
        self.state.items.borrow_mut().push(item);
        Progress::default()
    }

    fn progress(&self, _amount: Option<Progress>) {}
}

impl<T: 'static> Chainable for CollectDrain<T> {
    type Next = ();

    fn continuation(&self) {}
}

/// A drain that counts items.
pub struct CountDrain<T> {
    state: Rc<CountState<T>>,
}

struct CountState<T> {
    count: Cell<usize>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<T> Clone for CountDrain<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> CountDrain<T> {
    /// Create a new count drain.
    pub fn new() -> Self {
        Self {
            state: Rc::new(CountState {
                count: Cell::new(0),
                fount: RefCell::new(None),
            }),
        }
    }

    /// The number of items received so far.
    pub fn count(&self) -> usize {
        self.state.count.get()
    }
}

impl<T> Default for CountDrain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drain for CountDrain<T> {
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, _item: T) -> Progress {
        self.state.count.set(self.state.count.get() + 1);
        Progress::default()
    }

    fn progress(&self, _amount: Option<Progress>) {}
}

impl<T: 'static> Chainable for CountDrain<T> {
    type Next = ();

    fn continuation(&self) {}
}

/// A drain that prints items to stdout.
pub struct PrintDrain<T> {
    state: Rc<PrintState<T>>,
}

struct PrintState<T> {
    prefix: Option<String>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<T> Clone for PrintDrain<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> PrintDrain<T> {
    /// Create a new print drain.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a new print drain with a prefix.
    pub fn with_prefix(prefix: String) -> Self {
        Self::build(Some(prefix))
    }

    fn build(prefix: Option<String>) -> Self {
        Self {
            state: Rc::new(PrintState {
                prefix,
                fount: RefCell::new(None),
            }),
        }
    }
}

impl<T> Default for PrintDrain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Display + 'static> Drain for PrintDrain<T> {
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, item: T) -> Progress {
        match &self.state.prefix {
            Some(prefix) => println!("{}: {}", prefix, item),
            None => println!("{}", item),
        }
        Progress::default()
    }

    fn progress(&self, _amount: Option<Progress>) {}
}

impl<T: Display + 'static> Chainable for PrintDrain<T> {
    type Next = ();

    fn continuation(&self) {}
}

/// A drain that accepts one item at a time.
///
/// After every `receive` it pauses its fount; each call to
/// [`step`](StepDrain::step) resumes the flow for one more item. Useful as
/// a rate-limited consumer and for exercising mid-drain pauses.
pub struct StepDrain<T> {
    state: Rc<StepState<T>>,
}

struct StepState<T> {
    received: RefCell<Vec<T>>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<T> Clone for StepDrain<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> StepDrain<T> {
    /// Create a new step drain.
    pub fn new() -> Self {
        Self {
            state: Rc::new(StepState {
                received: RefCell::new(Vec::new()),
                fount: RefCell::new(None),
            }),
        }
    }

    /// Allow one more item through.
    pub fn step(&self) {
        let fount = self.state.fount.borrow().clone();
        if let Some(fount) = fount {
            fount.resume_flow();
        }
    }

    /// A snapshot of the items received so far.
    pub fn received(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.received.borrow().clone()
    }

    /// The number of items received.
    pub fn len(&self) -> usize {
        self.state.received.borrow().len()
    }

    /// Whether nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.state.received.borrow().is_empty()
    }
}

impl<T> Default for StepDrain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drain for StepDrain<T> {
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, item: T) -> Progress {
        self.state.received.borrow_mut().push(item);
        let fount = self.state.fount.borrow().clone();
        if let Some(fount) = fount {
            fount.pause_flow();
        }
        Progress::default()
    }

    fn progress(&self, _amount: Option<Progress>) {}
}

impl<T: 'static> Chainable for StepDrain<T> {
    type Next = ();

    fn continuation(&self) {}
}
