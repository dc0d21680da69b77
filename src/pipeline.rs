//! Multi-stage pipeline composition.
//!
//! A [`Pipeline`] chains several pumps into one logical segment: each pump
//! gets its own [`Tube`], and stage *i*'s fount face is wired to stage
//! *i + 1*'s drain face at construction time. The composite then acts as a
//! drain on its first stage and as a fount on its last, so a whole segment
//! drops into a pipeline anywhere a single tube would. The stages share no
//! buffer state; each link obeys the backpressure rules independently.

use std::rc::Rc;

use crate::error::Result;
use crate::kind::Kind;
use crate::traits::{Chainable, Drain, DrainRef, Fount, FountRef, Progress, Pump};
use crate::tube::Tube;

/// An ordered chain of tubes acting as one pipeline segment.
///
/// # Examples
///
/// ```rust
/// use siphon::prelude::*;
///
/// # fn main() -> siphon::Result<()> {
/// let segment = Pipeline::new(MapPump::new(|x: i64| x * 2))
///     .then(FilterPump::new(|x: &i64| *x > 4))?;
///
/// let fount = IterFount::new(1..=5i64);
/// let drain = CollectDrain::new();
/// fount.flow_to(&segment)?.flow_to(&drain)?;
///
/// assert_eq!(drain.items(), vec![6, 8, 10]);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<In, Out> {
    head: DrainRef<In>,
    tail: FountRef<Out>,
}

impl<In, Out> Clone for Pipeline<In, Out> {
    fn clone(&self) -> Self {
        Self {
            head: Rc::clone(&self.head),
            tail: Rc::clone(&self.tail),
        }
    }
}

impl<In: 'static, Out: 'static> Pipeline<In, Out> {
    /// Start a pipeline with a single stage built around `pump`.
    pub fn new<P>(pump: P) -> Self
    where
        P: Pump<Input = In, Output = Out> + 'static,
    {
        Self::from_tube(&Tube::new(pump))
    }

    /// Start a pipeline from an existing tube.
    ///
    /// The tube handle stays usable, so callers can still
    /// [`deliver`](Tube::deliver) into the stage directly.
    pub fn from_tube(tube: &Tube<In, Out>) -> Self {
        Pipeline {
            head: Rc::new(tube.drain()),
            tail: Rc::new(tube.fount()),
        }
    }

    /// Append a stage built around `pump`.
    ///
    /// Fails if the new stage rejects the previous stage's output kind.
    pub fn then<P>(self, pump: P) -> Result<Pipeline<In, P::Output>>
    where
        P: Pump<Input = Out> + 'static,
        P::Output: 'static,
    {
        self.then_tube(&Tube::new(pump))
    }

    /// Append an existing tube as the next stage.
    pub fn then_tube<Next: 'static>(self, tube: &Tube<Out, Next>) -> Result<Pipeline<In, Next>> {
        self.tail.attach(Rc::new(tube.drain()))?;
        Ok(Pipeline {
            head: self.head,
            tail: Rc::new(tube.fount()),
        })
    }
}

impl<In: 'static, Out: 'static> Drain for Pipeline<In, Out> {
    type Item = In;

    fn flowing_from(&self, fount: FountRef<In>) -> Result<()> {
        self.head.flowing_from(fount)
    }

    fn receive(&self, item: In) -> Progress {
        self.head.receive(item)
    }

    fn progress(&self, amount: Option<Progress>) {
        self.head.progress(amount)
    }
}

impl<In: 'static, Out: 'static> Chainable for Pipeline<In, Out> {
    type Next = PipelineFount<Out>;

    fn continuation(&self) -> PipelineFount<Out> {
        PipelineFount {
            tail: Rc::clone(&self.tail),
        }
    }
}

impl<In: 'static, Out: 'static> Fount for Pipeline<In, Out> {
    type Item = Out;

    fn output_kind(&self) -> Option<Kind> {
        self.tail.output_kind()
    }

    fn attach(&self, drain: DrainRef<Out>) -> Result<()> {
        self.tail.attach(drain)
    }

    fn pause_flow(&self) {
        self.tail.pause_flow()
    }

    fn resume_flow(&self) {
        self.tail.resume_flow()
    }

    fn flow_is_paused(&self) -> bool {
        self.tail.flow_is_paused()
    }
}

/// The fount face of a [`Pipeline`]: its last stage's fount.
pub struct PipelineFount<Out> {
    tail: FountRef<Out>,
}

impl<Out> Clone for PipelineFount<Out> {
    fn clone(&self) -> Self {
        Self {
            tail: Rc::clone(&self.tail),
        }
    }
}

impl<Out: 'static> Fount for PipelineFount<Out> {
    type Item = Out;

    fn output_kind(&self) -> Option<Kind> {
        self.tail.output_kind()
    }

    fn attach(&self, drain: DrainRef<Out>) -> Result<()> {
        self.tail.attach(drain)
    }

    fn pause_flow(&self) {
        self.tail.pause_flow()
    }

    fn resume_flow(&self) {
        self.tail.resume_flow()
    }

    fn flow_is_paused(&self) -> bool {
        self.tail.flow_is_paused()
    }
}
