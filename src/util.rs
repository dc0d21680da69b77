//! Helper constructors for building pipeline roles from closures.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::Result;
use crate::impls::founts::IterFount;
use crate::traits::{Chainable, Drain, FountRef, Progress, Pump};
use crate::tube::Tube;

/// Create a fount from a function returning successive items.
///
/// The function is called once per delivered item; returning `None` ends
/// the flow.
pub fn fount_from_fn<T, F>(f: F) -> IterFount<std::iter::FromFn<F>>
where
    F: FnMut() -> Option<T>,
{
    IterFount::new(std::iter::from_fn(f))
}

/// Create a pump from a function mapping one input to any number of
/// outputs.
pub fn pump_from_fn<F, T, U>(f: F) -> FnPump<F, T, U>
where
    F: FnMut(T) -> Vec<U>,
{
    FnPump {
        f,
        _phantom: PhantomData,
    }
}

/// A pump created from a function.
pub struct FnPump<F, T, U> {
    f: F,
    _phantom: PhantomData<(T, U)>,
}

impl<F, T, U> Pump for FnPump<F, T, U>
where
    F: FnMut(T) -> Vec<U> + 'static,
    T: 'static,
    U: 'static,
{
    type Input = T;
    type Output = U;

    fn received(&mut self, item: T, tube: &Tube<T, U>) -> Option<Progress> {
        for output in (self.f)(item) {
            tube.deliver(output);
        }
        None
    }
}

/// Create a drain from a function consuming each item.
pub fn drain_from_fn<T, F>(f: F) -> FnDrain<F, T>
where
    F: FnMut(T),
{
    FnDrain {
        state: Rc::new(FnDrainState {
            f: RefCell::new(f),
            fount: RefCell::new(None),
        }),
    }
}

/// A drain created from a function.
pub struct FnDrain<F, T> {
    state: Rc<FnDrainState<F, T>>,
}

struct FnDrainState<F, T> {
    f: RefCell<F>,
    fount: RefCell<Option<FountRef<T>>>,
}

impl<F, T> Clone for FnDrain<F, T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<F, T> Drain for FnDrain<F, T>
where
    F: FnMut(T) + 'static,
    T: 'static,
{
    type Item = T;

    fn flowing_from(&self, fount: FountRef<T>) -> Result<()> {
        *self.state.fount.borrow_mut() = Some(fount);
        Ok(())
    }

    fn receive(&self, item: T) -> Progress {
        (self.state.f.borrow_mut())(item);
        Progress::default()
    }

    fn progress(&self, _amount: Option<Progress>) {}
}

impl<F, T> Chainable for FnDrain<F, T>
where
    F: FnMut(T) + 'static,
    T: 'static,
{
    type Next = ();

    fn continuation(&self) {}
}
