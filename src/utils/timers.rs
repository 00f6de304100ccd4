/// One-shot timer scheduling behind an explicit cancellation handle.
///
/// `TimerHandle::cancel` consumes the handle, so a pending timer can be
/// cancelled at most once. Dropping a handle without cancelling leaves the
/// timer running.
pub struct TimerHandle {
    canceller: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(canceller: Box<dyn FnOnce()>) -> Self {
        Self {
            canceller: Some(canceller),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.canceller.take() {
            cancel();
        }
    }
}

pub trait Timers {
    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerHandle;
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserTimers;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_timers::callback::Timeout;

    use super::{TimerHandle, Timers};

    /// `setTimeout`-backed timers.
    pub struct BrowserTimers;

    impl Timers for BrowserTimers {
        fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerHandle {
            // The slot keeps the Timeout alive independently of the handle;
            // the callback clears it after firing, cancel clears it early.
            let slot: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
            let fired_slot = Rc::clone(&slot);
            let timeout = Timeout::new(delay_ms, move || {
                fired_slot.borrow_mut().take();
                callback();
            });
            *slot.borrow_mut() = Some(timeout);
            TimerHandle::new(Box::new(move || {
                if let Some(timeout) = slot.borrow_mut().take() {
                    timeout.cancel();
                }
            }))
        }
    }
}

#[cfg(test)]
pub use fake::FakeTimers;
