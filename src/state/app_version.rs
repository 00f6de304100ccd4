use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::*;

use crate::utils::net::NetworkStatus;
use crate::utils::storage::KeyValueStore;
use crate::utils::time::Clock;
use crate::utils::timers::{TimerHandle, Timers};

pub const AUTO_APPLY_DELAY_MS: u32 = 30_000;
pub const CHECK_FLAG_RESET_MS: u32 = 1_500;
pub const LAST_UPDATED_KEY: &str = "app_last_updated";

const ADMIN_ROUTE_PREFIX: &str = "/admin";

/// Whether `path` sits inside the admin area, where an unprompted reload
/// could throw away form input.
pub fn is_admin_route(path: &str) -> bool {
    path == ADMIN_ROUTE_PREFIX || path.starts_with("/admin/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Idle,
    Checking,
    UpdateAvailable,
    Applying,
}

/// The service-worker surface the controller needs. The browser
/// implementation talks to the registration; tests substitute a recorder.
pub trait WorkerBridge {
    /// Asks the registration to look for a newer worker script.
    fn request_update_check(&self);
    /// Tells the waiting worker to take over.
    fn activate_waiting(&self);
    fn reload(&self);
}

/// Drives the update lifecycle: check, wait, activate, reload exactly once.
///
/// When a new worker is waiting the controller applies it automatically
/// after a grace period, unless the reader is on an admin route, in which
/// case applying is left to an explicit action.
pub struct UpdateController {
    status: Cell<UpdateStatus>,
    is_checking: Cell<bool>,
    pending_apply: RefCell<Option<TimerHandle>>,
    network: Rc<dyn NetworkStatus>,
    timers: Rc<dyn Timers>,
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    worker: Rc<dyn WorkerBridge>,
}

impl UpdateController {
    pub fn new(
        network: Rc<dyn NetworkStatus>,
        timers: Rc<dyn Timers>,
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        worker: Rc<dyn WorkerBridge>,
    ) -> Self {
        Self {
            status: Cell::new(UpdateStatus::Idle),
            is_checking: Cell::new(false),
            pending_apply: RefCell::new(None),
            network,
            timers,
            store,
            clock,
            worker,
        }
    }

    pub fn status(&self) -> UpdateStatus {
        self.status.get()
    }

    pub fn is_checking(&self) -> bool {
        self.is_checking.get()
    }

    pub fn last_updated(&self) -> Option<String> {
        self.store.get(LAST_UPDATED_KEY)
    }

    /// Asks the worker registration for a newer script. No-op while offline
    /// or while a previous check is still settling; the checking flag clears
    /// itself after a short delay since registrations report nothing on a
    /// no-change check.
    pub fn check_for_updates(self: &Rc<Self>) {
        if self.is_checking.get() || !self.network.is_online() {
            return;
        }
        self.is_checking.set(true);
        if self.status.get() == UpdateStatus::Idle {
            self.status.set(UpdateStatus::Checking);
        }
        self.worker.request_update_check();

        let this = Rc::clone(self);
        let _handle = self.timers.schedule(
            CHECK_FLAG_RESET_MS,
            Box::new(move || {
                this.is_checking.set(false);
                if this.status.get() == UpdateStatus::Checking {
                    this.status.set(UpdateStatus::Idle);
                }
            }),
        );
    }

    /// Called when a new worker reaches the waiting state. `current_route`
    /// decides whether the grace-period auto-apply is armed.
    pub fn on_update_available(self: &Rc<Self>, current_route: &str) {
        self.status.set(UpdateStatus::UpdateAvailable);
        if is_admin_route(current_route) {
            log::info!("Update ready; auto-apply suppressed on admin route");
            return;
        }
        let this = Rc::clone(self);
        let handle = self.timers.schedule(
            AUTO_APPLY_DELAY_MS,
            Box::new(move || this.apply_update()),
        );
        if let Some(previous) = self.pending_apply.borrow_mut().replace(handle) {
            previous.cancel();
        }
    }

    /// Activates the waiting worker and reloads. Safe to call from both the
    /// grace-period timer and a manual action; whichever runs first wins and
    /// the page reloads exactly once.
    pub fn apply_update(&self) {
        let pending = self.pending_apply.borrow_mut().take();
        if let Some(handle) = pending {
            handle.cancel();
        }
        if self.status.replace(UpdateStatus::Applying) == UpdateStatus::Applying {
            return;
        }
        self.worker.activate_waiting();
        if let Err(err) = self
            .store
            .set(LAST_UPDATED_KEY, &self.clock.now().to_rfc3339())
        {
            log::warn!("Failed to record update timestamp: {}", err);
        }
        self.worker.reload();
    }

    /// Disarms the grace-period timer; the update stays available for a
    /// manual apply.
    pub fn cancel_pending_apply(&self) {
        if let Some(handle) = self.pending_apply.borrow_mut().take() {
            handle.cancel();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppVersionState {
    pub status: UpdateStatus,
    pub is_checking: bool,
}

impl Default for AppVersionState {
    fn default() -> Self {
        Self {
            status: UpdateStatus::Idle,
            is_checking: false,
        }
    }
}

pub fn use_app_version() -> (ReadSignal<AppVersionState>, WriteSignal<AppVersionState>) {
    create_signal(AppVersionState::default())
}

pub fn sync_app_version(controller: &UpdateController, set_state: WriteSignal<AppVersionState>) {
    set_state.set(AppVersionState {
        status: controller.status(),
        is_checking: controller.is_checking(),
    });
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserWorkerBridge;

#[cfg(target_arch = "wasm32")]
mod browser {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{ServiceWorkerContainer, ServiceWorkerRegistration};

    use super::WorkerBridge;

    const SKIP_WAITING_MESSAGE: &str = "SKIP_WAITING";

    pub struct BrowserWorkerBridge;

    impl BrowserWorkerBridge {
        fn container() -> Option<ServiceWorkerContainer> {
            Some(web_sys::window()?.navigator().service_worker())
        }

        async fn registration(container: ServiceWorkerContainer) -> Option<ServiceWorkerRegistration> {
            let value = JsFuture::from(container.get_registration()).await.ok()?;
            value.dyn_into::<ServiceWorkerRegistration>().ok()
        }
    }

    impl WorkerBridge for BrowserWorkerBridge {
        fn request_update_check(&self) {
            let Some(container) = Self::container() else {
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                if let Some(registration) = Self::registration(container).await {
                    let _ = registration.update();
                }
            });
        }

        fn activate_waiting(&self) {
            let Some(container) = Self::container() else {
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                if let Some(registration) = Self::registration(container).await {
                    if let Some(waiting) = registration.waiting() {
                        let _ = waiting.post_message(&JsValue::from_str(SKIP_WAITING_MESSAGE));
                    }
                }
            });
        }

        fn reload(&self) {
            if let Some(window) = web_sys::window() {
                let _ = window.location().reload();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::utils::net::FixedNetworkStatus;
    use crate::utils::storage::MemoryStore;
    use crate::utils::time::ManualClock;
    use crate::utils::timers::FakeTimers;

    #[derive(Default)]
    struct FakeWorker {
        checks: Cell<usize>,
        activations: Cell<usize>,
        reloads: Cell<usize>,
    }

    impl WorkerBridge for FakeWorker {
        fn request_update_check(&self) {
            self.checks.set(self.checks.get() + 1);
        }

        fn activate_waiting(&self) {
            self.activations.set(self.activations.get() + 1);
        }

        fn reload(&self) {
            self.reloads.set(self.reloads.get() + 1);
        }
    }

    struct Fixture {
        controller: Rc<UpdateController>,
        timers: Rc<FakeTimers>,
        worker: Rc<FakeWorker>,
        store: Rc<MemoryStore>,
        network: Rc<FixedNetworkStatus>,
    }

    fn fixture(online: bool) -> Fixture {
        let timers = Rc::new(FakeTimers::new());
        let worker = Rc::new(FakeWorker::default());
        let store = Rc::new(MemoryStore::new());
        let network = Rc::new(if online {
            FixedNetworkStatus::online()
        } else {
            FixedNetworkStatus::offline()
        });
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 10, 8, 0, 0).unwrap(),
        ));
        let controller = Rc::new(UpdateController::new(
            Rc::clone(&network) as Rc<dyn NetworkStatus>,
            Rc::clone(&timers) as Rc<dyn Timers>,
            Rc::clone(&store) as Rc<dyn KeyValueStore>,
            clock,
            Rc::clone(&worker) as Rc<dyn WorkerBridge>,
        ));
        Fixture {
            controller,
            timers,
            worker,
            store,
            network,
        }
    }

    #[test]
    fn admin_route_detection_matches_prefix_segments() {
        assert!(is_admin_route("/admin"));
        assert!(is_admin_route("/admin/trips"));
        assert!(!is_admin_route("/administration"));
        assert!(!is_admin_route("/trips"));
    }

    #[test]
    fn offline_checks_are_skipped() {
        let f = fixture(false);
        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 0);
        assert!(!f.controller.is_checking());
        assert_eq!(f.controller.status(), UpdateStatus::Idle);
    }

    #[test]
    fn checking_flag_resets_after_the_settle_delay() {
        let f = fixture(true);
        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 1);
        assert!(f.controller.is_checking());
        assert_eq!(f.controller.status(), UpdateStatus::Checking);
        assert_eq!(f.timers.delay_of(0), CHECK_FLAG_RESET_MS);

        // A second check while the first is settling is dropped.
        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 1);

        f.timers.fire(0);
        assert!(!f.controller.is_checking());
        assert_eq!(f.controller.status(), UpdateStatus::Idle);

        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 2);
    }

    #[test]
    fn grace_period_auto_applies_the_update() {
        let f = fixture(true);
        f.controller.on_update_available("/trips/alaska-2026");
        assert_eq!(f.controller.status(), UpdateStatus::UpdateAvailable);
        assert_eq!(f.timers.delay_of(0), AUTO_APPLY_DELAY_MS);

        assert!(f.timers.fire(0));
        assert_eq!(f.controller.status(), UpdateStatus::Applying);
        assert_eq!(f.worker.activations.get(), 1);
        assert_eq!(f.worker.reloads.get(), 1);
        assert!(f.store.get(LAST_UPDATED_KEY).is_some());
    }

    #[test]
    fn manual_apply_disarms_the_timer_and_reloads_once() {
        let f = fixture(true);
        f.controller.on_update_available("/");
        f.controller.apply_update();
        assert_eq!(f.worker.reloads.get(), 1);

        // The grace-period timer was cancelled; firing it is a no-op.
        assert!(!f.timers.fire(0));
        f.controller.apply_update();
        assert_eq!(f.worker.activations.get(), 1);
        assert_eq!(f.worker.reloads.get(), 1);
    }

    #[test]
    fn admin_routes_never_arm_the_auto_apply_timer() {
        let f = fixture(true);
        f.controller.on_update_available("/admin/ships");
        assert_eq!(f.controller.status(), UpdateStatus::UpdateAvailable);
        assert_eq!(f.timers.scheduled_count(), 0);

        f.controller.apply_update();
        assert_eq!(f.worker.reloads.get(), 1);
    }

    #[test]
    fn cancelling_the_pending_apply_keeps_the_update_available() {
        let f = fixture(true);
        f.controller.on_update_available("/");
        f.controller.cancel_pending_apply();
        assert!(!f.timers.fire(0));
        assert_eq!(f.controller.status(), UpdateStatus::UpdateAvailable);

        f.controller.apply_update();
        assert_eq!(f.worker.reloads.get(), 1);
    }

    #[test]
    fn a_newer_waiting_worker_replaces_the_armed_timer() {
        let f = fixture(true);
        f.controller.on_update_available("/");
        f.controller.on_update_available("/");
        assert_eq!(f.timers.scheduled_count(), 2);
        assert!(f.timers.is_cancelled(0));

        assert!(!f.timers.fire(0));
        assert!(f.timers.fire(1));
        assert_eq!(f.worker.reloads.get(), 1);
    }

    #[test]
    fn reconnecting_allows_checks_again() {
        let f = fixture(false);
        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 0);

        f.network.set_online(true);
        f.controller.check_for_updates();
        assert_eq!(f.worker.checks.get(), 1);
    }

    #[test]
    fn sync_publishes_controller_state_to_the_signal() {
        let runtime = leptos::create_runtime();
        let f = fixture(true);
        let (state, set_state) = use_app_version();

        f.controller.check_for_updates();
        sync_app_version(&f.controller, set_state);
        let snapshot = state.get_untracked();
        assert_eq!(snapshot.status, UpdateStatus::Checking);
        assert!(snapshot.is_checking);

        runtime.dispose();
    }
}
