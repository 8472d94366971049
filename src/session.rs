//! Session generations
//!
//! Every open starts a new generation and closing the viewer ends the
//! current one. Work that suspends captures its generation first and checks
//! it again before touching state or the surface.

use std::cell::Cell;
use std::rc::Rc;

/// Generation captured by one unit of asynchronous work
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Clock {
    current: Cell<u64>,
    closed: Cell<bool>,
}

/// Shared generation counter for one viewer session
#[derive(Clone, Debug, Default)]
pub struct SessionClock {
    inner: Rc<Clock>,
}

impl SessionClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding work from earlier ones
    pub fn begin(&self) -> Generation {
        let next = self.inner.current.get() + 1;
        self.inner.current.set(next);
        Generation(next)
    }

    /// The generation of the work currently allowed to mutate the session
    pub fn current(&self) -> Generation {
        Generation(self.inner.current.get())
    }

    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        !self.is_closed() && self.inner.current.get() == generation.0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// End the session; no generation is current afterwards
    pub fn close(&self) {
        self.inner.closed.set(true);
        self.inner.current.set(self.inner.current.get() + 1);
    }

    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            clock: self.clone(),
        }
    }
}

/// Closes a session from outside the task driving it
#[derive(Clone, Debug)]
pub struct CloseHandle {
    clock: SessionClock,
}

impl CloseHandle {
    pub fn close(&self) {
        log::debug!("Viewer session closed");
        self.clock.close();
    }

    pub fn is_closed(&self) -> bool {
        self.clock.is_closed()
    }
}
