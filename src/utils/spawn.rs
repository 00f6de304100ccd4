use futures::future::LocalBoxFuture;

/// Fire-and-forget execution of non-`Send` futures on the current thread.
pub trait Spawner {
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
}

#[cfg(target_arch = "wasm32")]
pub struct WasmSpawner;

#[cfg(target_arch = "wasm32")]
impl Spawner for WasmSpawner {
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(fut);
    }
}

pub use queue::QueueSpawner;

mod queue {
    use std::cell::RefCell;

    use futures::future::LocalBoxFuture;

    use super::Spawner;

    /// Collects spawned futures and drives them on demand. Used by host tests
    /// and SSR contexts where background work must stay deterministic.
    #[derive(Default)]
    pub struct QueueSpawner {
        queue: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    }

    impl QueueSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn pending(&self) -> usize {
            self.queue.borrow().len()
        }

        /// Drives every queued future to completion, including futures spawned
        /// while draining.
        pub fn run_until_idle(&self) {
            loop {
                let next = self.queue.borrow_mut().pop();
                match next {
                    Some(fut) => futures::executor::block_on(fut),
                    None => break,
                }
            }
        }
    }

    impl Spawner for QueueSpawner {
        fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
            self.queue.borrow_mut().push(fut);
        }
    }
}
