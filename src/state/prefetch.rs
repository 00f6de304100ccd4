use std::cell::Cell;
use std::rc::Rc;

use futures::future::{join_all, FutureExt};

use crate::api::client::ApiClient;
use crate::api::types::Role;
use crate::cache::{keys, QueryCache, QueryKey};
use crate::state::auth::SessionProvider;
use crate::utils::spawn::Spawner;
use crate::utils::timers::Timers;

pub const PREFETCH_DELAY_MS: u32 = 100;

fn reference_resources() -> Vec<(QueryKey, &'static str)> {
    vec![
        (keys::ships(), "/api/ships"),
        (keys::talent(), "/api/talent"),
        (keys::party_themes(), "/api/party-themes"),
        (keys::locations(), "/api/locations"),
        (keys::trip_info_sections(), "/api/trip-info-sections"),
        (keys::trips(), "/api/trips"),
    ]
}

/// Warms the query cache with the reference data a privileged session is
/// about to need. Runs once per session, never blocks rendering, and never
/// surfaces a failure to the caller.
pub struct AdminPrefetcher {
    cache: Rc<QueryCache>,
    api: Rc<ApiClient>,
    session: Rc<dyn SessionProvider>,
    timers: Rc<dyn Timers>,
    spawner: Rc<dyn Spawner>,
    completed: Cell<bool>,
}

impl AdminPrefetcher {
    pub fn new(
        cache: Rc<QueryCache>,
        api: Rc<ApiClient>,
        session: Rc<dyn SessionProvider>,
        timers: Rc<dyn Timers>,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        Self {
            cache,
            api,
            session,
            timers,
            spawner,
            completed: Cell::new(false),
        }
    }

    pub fn has_run(&self) -> bool {
        self.completed.get()
    }

    /// Kicks off the prefetch shortly after authentication settles. The delay
    /// keeps first paint ahead of the warm-up traffic.
    pub fn schedule(self: &Rc<Self>) {
        if self.completed.get() {
            return;
        }
        let this = Rc::clone(self);
        let spawner = Rc::clone(&self.spawner);
        let _handle = self.timers.schedule(
            PREFETCH_DELAY_MS,
            Box::new(move || {
                let task = Rc::clone(&this);
                spawner.spawn(async move { task.run().await }.boxed_local());
            }),
        );
    }

    pub async fn run(&self) {
        if self.completed.get() {
            return;
        }
        let Some(session) = self.session.current_session() else {
            return;
        };
        if !session.role.is_privileged() {
            return;
        }
        self.completed.set(true);

        let tier: Vec<_> = reference_resources()
            .into_iter()
            .map(|(key, path)| self.prefetch_one(key, path))
            .collect();
        join_all(tier).await;

        if session.role == Role::SuperAdmin {
            self.prefetch_one(keys::users(), "/api/admin/users").await;
        }
    }

    async fn prefetch_one(&self, key: QueryKey, path: &'static str) {
        let api = Rc::clone(&self.api);
        let fetch = move || {
            let api = Rc::clone(&api);
            async move { api.fetch_value(path).await }.boxed_local()
        };
        if let Err(err) = self.cache.read(key.clone(), fetch).await {
            log::warn!("Prefetch for {} failed: {}", key, err);
        }
    }
}
