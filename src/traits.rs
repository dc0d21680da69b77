//! Core traits for the flow-control protocol.
//!
//! This module defines the four roles of a pipeline: a [`Fount`] produces
//! items, a [`Drain`] consumes them, a [`Pump`] holds user transformation
//! logic, and the [`Tube`](crate::tube::Tube) engine binds a pump to its
//! neighbors. Items are pushed fount-to-drain; pause/resume signals travel
//! the opposite direction, so a slow consumer can stop production without
//! losing in-flight data.
//!
//! Protocol objects are cheap-clone handles over shared state. Everything
//! runs on one thread with plain call/return; "backpressure" is explicit
//! signaling between calls, never blocking.

use std::rc::Rc;

use crate::error::Result;
use crate::kind::Kind;
use crate::tube::Tube;

/// A shared handle to a fount, as stored by the drain it feeds.
pub type FountRef<T> = Rc<dyn Fount<Item = T>>;

/// A shared handle to a drain, as stored by the fount feeding it.
pub type DrainRef<T> = Rc<dyn Drain<Item = T>>;

/// An opaque indicator of how much of a received item's work was completed.
///
/// The conventional default, `0.5`, means "fully handled, no finer signal
/// given". Hooks that have nothing more precise to say return `None` and
/// let the tube substitute the default.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Progress(f64);

impl Progress {
    /// Create a progress indicator from a raw amount.
    pub const fn new(amount: f64) -> Self {
        Self(amount)
    }

    /// The raw amount.
    pub const fn amount(&self) -> f64 {
        self.0
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self(0.5)
    }
}

/// An upstream role: produces items into a pipeline and honors pause and
/// resume signals from the drain it feeds.
///
/// Founts are push-based: once attached, a fount delivers items by calling
/// [`Drain::receive`] until its drain asks it to pause. A fount feeds at
/// most one drain at a time; attaching another replaces the first.
///
/// Implementations are expected to be cheap-clone handles (shared interior
/// state behind an `Rc`), since [`attach`](Fount::attach) hands a clone of
/// the fount to the drain for upstream signaling.
pub trait Fount {
    /// The type of items this fount produces.
    type Item;

    /// The kind of items this fount advertises, if any.
    ///
    /// Consulted by a tube's input validation when its pump declares an
    /// [`input_kind`](Pump::input_kind); founts with nothing to declare
    /// skip the check entirely.
    fn output_kind(&self) -> Option<Kind> {
        None
    }

    /// Wire `drain` in as this fount's sole consumer.
    ///
    /// Implementations must call `drain.flowing_from(..)` with a handle to
    /// themselves *before* recording the drain, so a rejected attachment
    /// (kind mismatch) leaves no state behind on either side. Most callers
    /// want [`FountExt::flow_to`], which adds the typed continuation value
    /// on top of this object-safe hook.
    fn attach(&self, drain: DrainRef<Self::Item>) -> Result<()>;

    /// Request that production stop until a matching [`resume_flow`]
    /// arrives. Side effect only.
    ///
    /// [`resume_flow`]: Fount::resume_flow
    fn pause_flow(&self);

    /// Request that production continue. Side effect only.
    fn resume_flow(&self);

    /// Whether this fount is currently paused.
    fn flow_is_paused(&self) -> bool;
}

/// Extension trait adding typed attachment chaining to every [`Fount`].
///
/// # Examples
///
/// ```rust
/// use siphon::prelude::*;
///
/// # fn main() -> siphon::Result<()> {
/// let fount = IterFount::new(0..3i64);
/// let tube = Tube::new(IdentityPump::<i64>::new());
/// let drain = CollectDrain::new();
///
/// // `flow_to` returns the drain's continuation, so attachments chain
/// // until a terminal drain ends the pipeline.
/// fount.flow_to(&tube.drain())?.flow_to(&drain)?;
///
/// assert_eq!(drain.items(), vec![0, 1, 2]);
/// # Ok(())
/// # }
/// ```
pub trait FountExt: Fount {
    /// Attach `drain` and return its continuation for further chaining.
    ///
    /// Fails, recording nothing, if the drain rejects the attachment.
    fn flow_to<D>(&self, drain: &D) -> Result<D::Next>
    where
        Self: Sized,
        D: Chainable<Item = Self::Item> + Clone + 'static,
    {
        self.attach(Rc::new(drain.clone()))?;
        Ok(drain.continuation())
    }
}

impl<F: Fount + ?Sized> FountExt for F {}

/// A downstream role: consumes items pushed by the fount feeding it.
///
/// A drain may react to input synchronously from inside
/// [`receive`](Drain::receive), including by pausing the very fount that
/// is delivering to it; founts and tubes must tolerate that re-entrancy.
pub trait Drain {
    /// The type of items this drain accepts.
    type Item;

    /// Record `fount` as the upstream feeding this drain.
    ///
    /// A tube's drain face validates the fount's advertised kind here and,
    /// if the tube already has buffered output pending, pauses the new
    /// fount before returning: a freshly attached upstream must not add to
    /// an already-full buffer.
    fn flowing_from(&self, fount: FountRef<Self::Item>) -> Result<()>;

    /// Deliver one item, returning a progress indicator for it.
    fn receive(&self, item: Self::Item) -> Progress;

    /// Informational forward signal: upstream did work on our behalf that
    /// produced no item yet. No return value.
    fn progress(&self, amount: Option<Progress>);
}

/// The continuation a successful attachment yields.
///
/// A tube's drain face continues with the tube's fount face, so pipelines
/// chain stage by stage; terminal drains use `Next = ()` and end the
/// chain.
pub trait Chainable: Drain {
    /// What [`FountExt::flow_to`] hands back after attaching this drain.
    type Next;

    /// The continuation handle.
    fn continuation(&self) -> Self::Next;
}

/// User transformation logic plugged into a [`Tube`].
///
/// A pump never talks to the pipeline directly: its owning tube invokes
/// the hooks below and passes itself as the `tube` argument, which is the
/// pump's only channel for emitting output (via [`Tube::deliver`]). The
/// tube owns its pump exclusively; replacing the pump returns the previous
/// one.
///
/// # Examples
///
/// ```rust
/// use siphon::prelude::*;
///
/// struct DoublePump;
///
/// impl Pump for DoublePump {
///     type Input = i64;
///     type Output = i64;
///
///     fn received(&mut self, item: i64, tube: &Tube<i64, i64>) -> Option<Progress> {
///         tube.deliver(item * 2);
///         None // let the tube report the default progress indicator
///     }
/// }
///
/// # fn main() -> siphon::Result<()> {
/// let tube = Tube::new(DoublePump);
/// let drain = CollectDrain::new();
/// tube.fount().flow_to(&drain)?;
///
/// tube.drain().receive(21);
/// assert_eq!(drain.items(), vec![42]);
/// # Ok(())
/// # }
/// ```
pub trait Pump {
    /// The type of items this pump accepts.
    type Input;
    /// The type of items this pump produces.
    type Output;

    /// The kind of input this pump requires, if any.
    ///
    /// Declaring one opts the owning tube into upstream validation: founts
    /// advertising an incompatible kind are rejected at attachment.
    fn input_kind(&self) -> Option<Kind> {
        None
    }

    /// The kind of output this pump produces, if any.
    ///
    /// Advertised downstream by the owning tube's fount face.
    fn output_kind(&self) -> Option<Kind> {
        None
    }

    /// Called once, when the owning tube first has a connected downstream
    /// drain while this pump is the current owner.
    ///
    /// This is the hook for a pump that wants to deliver synthesized
    /// output immediately, before any input arrives.
    fn started(&mut self, tube: &Tube<Self::Input, Self::Output>) {
        let _ = tube;
    }

    /// Called for every item the tube accepts from upstream.
    ///
    /// May call `tube.deliver(..)` zero or more times. Returning `None`
    /// makes the tube report the default progress indicator to the caller.
    fn received(
        &mut self,
        item: Self::Input,
        tube: &Tube<Self::Input, Self::Output>,
    ) -> Option<Progress>;

    /// Informational hook mirroring [`Drain::progress`].
    fn progressed(&mut self, amount: Option<Progress>) {
        let _ = amount;
    }
}
