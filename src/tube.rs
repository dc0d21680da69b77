//! The tube engine: buffering and pause bookkeeping between a pump and its
//! neighbors.
//!
//! A [`Tube`] presents two faces over one shared state: an upstream-facing
//! [`TubeDrain`] that receives from the fount feeding it, and a
//! downstream-facing [`TubeFount`] that feeds the drain it is attached to.
//! Items flow from the upstream fount through the drain face, the pump,
//! and the fount face into the downstream drain; pause and resume signals
//! flow the opposite direction.
//!
//! The engine's obligations:
//!
//! - Output delivered while there is no ready downstream is buffered FIFO,
//!   and the upstream fount is paused on the *first* buffered item;
//!   pause/resume toward upstream are edge-triggered, never redundant.
//! - When a downstream drain attaches (or resumes), buffered items are
//!   unbuffered one at a time, stopping immediately if the drain pauses
//!   from inside `receive`; once the buffer empties, the upstream fount is
//!   resumed exactly once.
//! - Everything is synchronous and re-entrant: `deliver` runs inside
//!   `receive`, and a pause can arrive in the middle of an unbuffering
//!   pass. No `RefCell` borrow is held across a call into a neighbor, and
//!   the pass itself is guarded against re-entry.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::kind::{ExactMatch, Kind, KindQuery};
use crate::traits::{Chainable, Drain, DrainRef, Fount, FountRef, Progress, Pump};

macro_rules! flow_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    }};
}

struct TubeState<In, Out> {
    pump: RefCell<Box<dyn Pump<Input = In, Output = Out>>>,
    query: Box<dyn KindQuery>,
    upstream: RefCell<Option<FountRef<In>>>,
    downstream: RefCell<Option<DrainRef<Out>>>,
    buffer: RefCell<VecDeque<Out>>,
    /// True iff we have asked `upstream` to pause and not yet to resume.
    upstream_paused: Cell<bool>,
    /// True iff our downstream has paused our fount face.
    downstream_paused: Cell<bool>,
    /// Re-entrancy guard for the unbuffering pass.
    unbuffering: Cell<bool>,
    /// Whether the current pump's `started` hook has fired.
    started: Cell<bool>,
    /// Whether the pump called `deliver` during the `receive` in flight.
    delivered: Cell<bool>,
}

/// The engine binding one [`Pump`] to its upstream fount and downstream
/// drain.
///
/// `Tube` is the owner handle: it holds the pump slot and exposes
/// [`deliver`](Tube::deliver), plus accessors for the two protocol faces.
/// The same handle is what pump hooks receive as their back-reference,
/// scoped to the duration of the call.
pub struct Tube<In, Out> {
    state: Rc<TubeState<In, Out>>,
}

/// A tube's upstream-facing drain face.
pub struct TubeDrain<In, Out> {
    state: Rc<TubeState<In, Out>>,
}

/// A tube's downstream-facing fount face.
pub struct TubeFount<In, Out> {
    state: Rc<TubeState<In, Out>>,
}

impl<In, Out> Clone for TubeDrain<In, Out> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<In, Out> Clone for TubeFount<In, Out> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<In, Out> std::fmt::Debug for TubeFount<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TubeFount").finish_non_exhaustive()
    }
}

impl<In: 'static, Out: 'static> Tube<In, Out> {
    /// Create a tube around `pump`, validating attachments with the
    /// default [`ExactMatch`] kind query.
    pub fn new<P>(pump: P) -> Self
    where
        P: Pump<Input = In, Output = Out> + 'static,
    {
        Self::with_query(pump, ExactMatch)
    }

    /// Create a tube around `pump` with a custom kind query.
    pub fn with_query<P, Q>(pump: P, query: Q) -> Self
    where
        P: Pump<Input = In, Output = Out> + 'static,
        Q: KindQuery + 'static,
    {
        Tube {
            state: Rc::new(TubeState {
                pump: RefCell::new(Box::new(pump)),
                query: Box::new(query),
                upstream: RefCell::new(None),
                downstream: RefCell::new(None),
                buffer: RefCell::new(VecDeque::new()),
                upstream_paused: Cell::new(false),
                downstream_paused: Cell::new(false),
                unbuffering: Cell::new(false),
                started: Cell::new(false),
                delivered: Cell::new(false),
            }),
        }
    }

    /// This tube's drain face, for attaching an upstream fount.
    pub fn drain(&self) -> TubeDrain<In, Out> {
        TubeDrain {
            state: Rc::clone(&self.state),
        }
    }

    /// This tube's fount face, for attaching a downstream drain.
    pub fn fount(&self) -> TubeFount<In, Out> {
        TubeFount {
            state: Rc::clone(&self.state),
        }
    }

    /// Replace the pump, returning the previous one.
    ///
    /// The new pump becomes the tube's exclusive logic; its `started` hook
    /// fires immediately if a downstream drain is already connected,
    /// otherwise when one attaches. Must not be called from inside a pump
    /// hook of this same tube.
    pub fn set_pump<P>(&self, pump: P) -> Box<dyn Pump<Input = In, Output = Out>>
    where
        P: Pump<Input = In, Output = Out> + 'static,
    {
        let previous = std::mem::replace(&mut *self.state.pump.borrow_mut(), Box::new(pump));
        self.state.started.set(false);
        self.maybe_start();
        previous
    }

    /// Emit one item of pump output toward the downstream drain.
    ///
    /// Forwards immediately when a downstream drain is connected, ready,
    /// and nothing is already queued ahead of the item; otherwise the item
    /// joins the pending buffer, pausing the upstream fount if this is the
    /// first item the tube has had to hold back.
    pub fn deliver(&self, item: Out) {
        let s = &*self.state;
        s.delivered.set(true);
        let ready =
            !s.unbuffering.get() && !s.downstream_paused.get() && s.buffer.borrow().is_empty();
        let drain = s.downstream.borrow().clone();
        match drain {
            Some(drain) if ready => {
                drain.receive(item);
            }
            _ => {
                s.buffer.borrow_mut().push_back(item);
                flow_trace!(depth = s.buffer.borrow().len(), "buffered item");
                if !s.upstream_paused.get() {
                    let fount = s.upstream.borrow().clone();
                    if let Some(fount) = fount {
                        s.upstream_paused.set(true);
                        flow_trace!("pausing upstream fount");
                        fount.pause_flow();
                    }
                }
            }
        }
    }

    fn maybe_start(&self) {
        let s = &*self.state;
        if s.started.get() || s.downstream.borrow().is_none() {
            return;
        }
        s.started.set(true);
        s.pump.borrow_mut().started(self);
    }

    fn handle_flowing_from(&self, fount: FountRef<In>) -> Result<()> {
        let s = &*self.state;
        let required = s.pump.borrow().input_kind();
        if let Some(required) = required {
            if let Some(offered) = fount.output_kind() {
                if !s.query.satisfies(offered, required) {
                    flow_trace!(%offered, %required, "rejecting attachment: kind mismatch");
                    return Err(Error::KindMismatch { offered, required });
                }
            }
        }
        if s.buffer.borrow().is_empty() {
            s.upstream_paused.set(false);
        } else {
            // Buffered items logically precede anything this fount could
            // produce; hold it back until the backlog clears.
            s.upstream_paused.set(true);
            fount.pause_flow();
        }
        *s.upstream.borrow_mut() = Some(fount);
        Ok(())
    }

    fn handle_receive(&self, item: In) -> Progress {
        let s = &*self.state;
        s.delivered.set(false);
        let result = s.pump.borrow_mut().received(item, self);
        if !s.delivered.get() {
            // Received but produced nothing yet; say so downstream.
            let drain = s.downstream.borrow().clone();
            if let Some(drain) = drain {
                drain.progress(None);
            }
        }
        result.unwrap_or_default()
    }

    fn handle_progress(&self, amount: Option<Progress>) {
        let s = &*self.state;
        s.pump.borrow_mut().progressed(amount);
        let drain = s.downstream.borrow().clone();
        if let Some(drain) = drain {
            drain.progress(amount);
        }
    }

    fn handle_attach(&self, drain: DrainRef<Out>) -> Result<()> {
        let s = &*self.state;
        // A fresh consumer starts us unpaused; restore the old state if it
        // rejects the attachment mid-handshake.
        let was_paused = s.downstream_paused.replace(false);
        let fount: FountRef<Out> = Rc::new(self.fount());
        if let Err(err) = drain.flowing_from(fount) {
            s.downstream_paused.set(was_paused);
            return Err(err);
        }
        *s.downstream.borrow_mut() = Some(drain);
        self.maybe_start();
        self.unbuffer_pass();
        Ok(())
    }

    fn handle_resume(&self) {
        self.state.downstream_paused.set(false);
        self.unbuffer_pass();
    }

    /// Drain the pending buffer into the downstream drain, FIFO, stopping
    /// immediately if the drain pauses us from inside `receive`. Resumes
    /// the upstream fount exactly once if the pass leaves the buffer
    /// empty.
    fn unbuffer_pass(&self) {
        let s = &*self.state;
        if s.unbuffering.get() {
            return;
        }
        s.unbuffering.set(true);
        while !s.downstream_paused.get() {
            let item = s.buffer.borrow_mut().pop_front();
            let Some(item) = item else { break };
            let drain = s.downstream.borrow().clone();
            match drain {
                Some(drain) => {
                    drain.receive(item);
                }
                None => {
                    s.buffer.borrow_mut().push_front(item);
                    break;
                }
            }
        }
        s.unbuffering.set(false);
        if s.downstream_paused.get() && !s.buffer.borrow().is_empty() {
            flow_trace!(
                remaining = s.buffer.borrow().len(),
                "unbuffering pass interrupted by downstream pause"
            );
        }
        if s.upstream_paused.get() && s.buffer.borrow().is_empty() {
            s.upstream_paused.set(false);
            let fount = s.upstream.borrow().clone();
            if let Some(fount) = fount {
                flow_trace!("buffer drained; resuming upstream fount");
                fount.resume_flow();
            }
        }
    }
}

impl<In: 'static, Out: 'static> TubeDrain<In, Out> {
    fn tube(&self) -> Tube<In, Out> {
        Tube {
            state: Rc::clone(&self.state),
        }
    }
}

impl<In: 'static, Out: 'static> TubeFount<In, Out> {
    fn tube(&self) -> Tube<In, Out> {
        Tube {
            state: Rc::clone(&self.state),
        }
    }
}

impl<In: 'static, Out: 'static> Drain for TubeDrain<In, Out> {
    type Item = In;

    fn flowing_from(&self, fount: FountRef<In>) -> Result<()> {
        self.tube().handle_flowing_from(fount)
    }

    fn receive(&self, item: In) -> Progress {
        self.tube().handle_receive(item)
    }

    fn progress(&self, amount: Option<Progress>) {
        self.tube().handle_progress(amount)
    }
}

impl<In: 'static, Out: 'static> Chainable for TubeDrain<In, Out> {
    type Next = TubeFount<In, Out>;

    fn continuation(&self) -> TubeFount<In, Out> {
        TubeFount {
            state: Rc::clone(&self.state),
        }
    }
}

impl<In: 'static, Out: 'static> Fount for TubeFount<In, Out> {
    type Item = Out;

    fn output_kind(&self) -> Option<Kind> {
        self.state.pump.borrow().output_kind()
    }

    fn attach(&self, drain: DrainRef<Out>) -> Result<()> {
        self.tube().handle_attach(drain)
    }

    fn pause_flow(&self) {
        self.state.downstream_paused.set(true);
    }

    fn resume_flow(&self) {
        self.tube().handle_resume()
    }

    fn flow_is_paused(&self) -> bool {
        self.state.downstream_paused.get()
    }
}
