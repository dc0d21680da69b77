//! Pump implementations.
//!
//! This module provides concrete pumps for the common transformations a
//! pipeline stage performs.

use std::marker::PhantomData;

use crate::traits::{Progress, Pump};
use crate::tube::Tube;

/// A pump that forwards items unchanged.
pub struct IdentityPump<T> {
    _phantom: PhantomData<T>,
}

impl<T> IdentityPump<T> {
    /// Create a new identity pump.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for IdentityPump<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Pump for IdentityPump<T> {
    type Input = T;
    type Output = T;

    fn received(&mut self, item: T, tube: &Tube<T, T>) -> Option<Progress> {
        tube.deliver(item);
        None
    }
}

/// A pump that maps items through a function.
pub struct MapPump<F, T, U> {
    f: F,
    _phantom: PhantomData<(T, U)>,
}

impl<F, T, U> MapPump<F, T, U> {
    /// Create a new map pump.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, U> Pump for MapPump<F, T, U>
where
    F: FnMut(T) -> U + 'static,
    T: 'static,
    U: 'static,
{
    type Input = T;
    type Output = U;

    fn received(&mut self, item: T, tube: &Tube<T, U>) -> Option<Progress> {
        tube.deliver((self.f)(item));
        None
    }
}

/// A pump that only passes items satisfying a predicate.
pub struct FilterPump<F, T> {
    predicate: F,
    _phantom: PhantomData<T>,
}

impl<F, T> FilterPump<F, T> {
    /// Create a new filter pump.
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Pump for FilterPump<F, T>
where
    F: FnMut(&T) -> bool + 'static,
    T: 'static,
{
    type Input = T;
    type Output = T;

    fn received(&mut self, item: T, tube: &Tube<T, T>) -> Option<Progress> {
        if (self.predicate)(&item) {
            tube.deliver(item);
        }
        None
    }
}

/// A pump that groups items into fixed-size batches.
///
/// A partial batch is held until it fills; its fill level is reported
/// through the progress channel in the meantime. Teardown is outside this
/// protocol, so a remainder never flushes on its own.
pub struct BatchPump<T> {
    size: usize,
    batch: Vec<T>,
}

impl<T> BatchPump<T> {
    /// Create a new batch pump emitting batches of `size` items.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "batch size must be non-zero");
        Self {
            size,
            batch: Vec::with_capacity(size),
        }
    }
}

impl<T: 'static> Pump for BatchPump<T> {
    type Input = T;
    type Output = Vec<T>;

    fn received(&mut self, item: T, tube: &Tube<T, Vec<T>>) -> Option<Progress> {
        self.batch.push(item);
        if self.batch.len() >= self.size {
            let full = std::mem::replace(&mut self.batch, Vec::with_capacity(self.size));
            tube.deliver(full);
            None
        } else {
            Some(Progress::new(self.batch.len() as f64 / self.size as f64))
        }
    }
}
