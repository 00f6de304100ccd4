use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use futures::future::FutureExt;
use leptos::*;

use crate::api::client::ApiClient;
use crate::api::types::{ApiError, TripUpdate};
use crate::cache::{keys, QueryCache};
use crate::state::auth::SessionProvider;
use crate::utils::storage::KeyValueStore;
use crate::utils::time::Clock;

pub const ANONYMOUS_WATERMARK_KEY: &str = "updates_last_read";

/// A maximal run of consecutive feed entries from the same trip. The same
/// trip can appear again further down the feed in a separate group.
#[derive(Debug, Clone)]
pub struct UpdateGroup {
    pub trip_id: i64,
    pub trip_name: Option<String>,
    pub trip_slug: Option<String>,
    pub items: Vec<TripUpdate>,
}

/// Sorts newest-first (stable, so entries sharing a timestamp keep their
/// served order) and groups adjacent entries by trip.
pub fn group_updates(records: &[TripUpdate]) -> Vec<UpdateGroup> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut groups: Vec<UpdateGroup> = Vec::new();
    for record in sorted {
        match groups.last_mut() {
            Some(group) if group.trip_id == record.trip_id => group.items.push(record),
            _ => groups.push(UpdateGroup {
                trip_id: record.trip_id,
                trip_name: record.trip_name.clone(),
                trip_slug: record.trip_slug.clone(),
                items: vec![record],
            }),
        }
    }
    groups
}

/// Tracks the reader's "seen up to" watermark for the trip-update feed.
///
/// Authenticated readers keep the watermark server-side so it follows them
/// across devices; anonymous readers keep it in local storage. The watermark
/// only ever moves forward, and only when the panel transitions from closed
/// to open.
pub struct NotificationTracker {
    api: Rc<ApiClient>,
    session: Rc<dyn SessionProvider>,
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    watermark: Cell<Option<DateTime<Utc>>>,
    resolved: Cell<bool>,
    panel_open: Cell<bool>,
}

impl NotificationTracker {
    pub fn new(
        api: Rc<ApiClient>,
        session: Rc<dyn SessionProvider>,
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            session,
            store,
            clock,
            watermark: Cell::new(None),
            resolved: Cell::new(false),
            panel_open: Cell::new(false),
        }
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark.get()
    }

    /// Loads the persisted watermark once. A missing watermark means every
    /// feed entry counts as unread; a failed server read leaves the tracker
    /// unresolved so a later call retries.
    pub async fn resolve_watermark(&self) {
        if self.resolved.get() {
            return;
        }
        match self.session.current_session() {
            Some(_) => match self.api.get_notification_watermark().await {
                Ok(watermark) => self.watermark.set(watermark.last_read_at),
                Err(err) => {
                    log::warn!("Failed to load notification watermark: {}", err);
                    return;
                }
            },
            None => {
                let stored = self
                    .store
                    .get(ANONYMOUS_WATERMARK_KEY)
                    .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                    .map(|parsed| parsed.with_timezone(&Utc));
                self.watermark.set(stored);
            }
        }
        self.resolved.set(true);
    }

    pub fn is_unread(&self, record: &TripUpdate) -> bool {
        match self.watermark.get() {
            Some(watermark) => record.created_at > watermark,
            None => true,
        }
    }

    pub fn unread_count(&self, records: &[TripUpdate]) -> usize {
        records.iter().filter(|record| self.is_unread(record)).count()
    }

    /// Records the panel state. Only the closed-to-open transition advances
    /// the watermark; reopening an already-open panel is a no-op.
    pub async fn set_open(&self, open: bool) {
        let was_open = self.panel_open.replace(open);
        if open && !was_open {
            self.advance().await;
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel_open.get()
    }

    async fn advance(&self) {
        let now = self.clock.now();
        if let Some(current) = self.watermark.get() {
            // Monotonic: a clock running behind the stored value never
            // rewinds the watermark.
            if now <= current {
                return;
            }
        }
        self.watermark.set(Some(now));

        if self.session.current_session().is_some() {
            if let Err(err) = self.api.put_notification_watermark(now).await {
                log::warn!("Failed to persist notification watermark: {}", err);
            }
        } else if let Err(err) = self.store.set(ANONYMOUS_WATERMARK_KEY, &now.to_rfc3339()) {
            log::warn!("Failed to persist notification watermark locally: {}", err);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    pub updates: Vec<TripUpdate>,
    pub unread_count: usize,
    pub panel_open: bool,
    pub loading: bool,
}

pub fn use_notifications() -> (ReadSignal<NotificationState>, WriteSignal<NotificationState>) {
    create_signal(NotificationState::default())
}

/// Resolves the watermark, then loads the feed through the cache and
/// publishes the unread count. Mounting always revalidates: a cached feed is
/// served immediately while the refetch runs, so fresh announcements surface
/// without blocking the panel.
pub async fn load_updates(
    tracker: &NotificationTracker,
    cache: &Rc<QueryCache>,
    api: Rc<ApiClient>,
    set_state: WriteSignal<NotificationState>,
) -> Result<(), ApiError> {
    set_state.update(|state| state.loading = true);
    tracker.resolve_watermark().await;

    let fetch = move || {
        let api = Rc::clone(&api);
        async move { api.fetch_value("/api/updates").await }.boxed_local()
    };
    match cache
        .read_revalidate_as::<Vec<TripUpdate>, _>(keys::trip_updates(), fetch)
        .await
    {
        Ok(updates) => {
            let unread = tracker.unread_count(&updates);
            set_state.update(|state| {
                state.updates = updates;
                state.unread_count = unread;
                state.loading = false;
            });
            Ok(())
        }
        Err(error) => {
            set_state.update(|state| state.loading = false);
            Err(error)
        }
    }
}

pub async fn set_panel_open(
    tracker: &NotificationTracker,
    set_state: WriteSignal<NotificationState>,
    open: bool,
) {
    tracker.set_open(open).await;
    set_state.update(|state| {
        state.panel_open = open;
        if open {
            state.unread_count = 0;
        }
    });
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chrono::{Duration, TimeZone};
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::api::types::{Role, Session};
    use crate::state::auth::StaticSessionProvider;
    use crate::utils::net::FixedNetworkStatus;
    use crate::utils::spawn::QueueSpawner;
    use crate::utils::storage::{CookieStore, MemoryCookieStore, MemoryStore};
    use crate::utils::time::ManualClock;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn update(id: i64, trip_id: i64, minutes_ago: i64) -> TripUpdate {
        TripUpdate {
            id,
            trip_id,
            title: format!("Update {}", id),
            description: "details".into(),
            created_at: base_time() - Duration::minutes(minutes_ago),
            trip_name: Some(format!("Trip {}", trip_id)),
            trip_slug: Some(format!("trip-{}", trip_id)),
            start_date: None,
        }
    }

    fn session() -> Session {
        Session {
            access_token: "test-token".into(),
            user_id: "u1".into(),
            role: Role::ContentManager,
            expires_at: None,
        }
    }

    fn anonymous_tracker(
        store: Rc<MemoryStore>,
        clock: Rc<ManualClock>,
    ) -> NotificationTracker {
        let provider: Rc<dyn SessionProvider> = Rc::new(StaticSessionProvider::anonymous());
        let api = Rc::new(ApiClient::new_with_base_url(
            "http://localhost:0",
            Rc::clone(&provider),
            Rc::new(FixedNetworkStatus::online()),
            Rc::new(MemoryCookieStore::new()),
        ));
        NotificationTracker::new(api, provider, store, clock)
    }

    fn authed_tracker(server: &MockServer, clock: Rc<ManualClock>) -> NotificationTracker {
        let provider: Rc<dyn SessionProvider> =
            Rc::new(StaticSessionProvider::with_session(session()));
        let cookies = Rc::new(MemoryCookieStore::new());
        cookies.set("_csrf", "csrf-test");
        let api = Rc::new(ApiClient::new_with_base_url(
            server.base_url(),
            Rc::clone(&provider),
            Rc::new(FixedNetworkStatus::online()),
            cookies,
        ));
        NotificationTracker::new(api, provider, Rc::new(MemoryStore::new()), clock)
    }

    #[test]
    fn grouping_splits_on_every_trip_change() {
        // Feed order by recency: trip 1, trip 1, trip 2, trip 1.
        let records = vec![
            update(1, 1, 0),
            update(2, 1, 5),
            update(3, 2, 10),
            update(4, 1, 15),
        ];
        let groups = group_updates(&records);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].trip_id, 1);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].trip_id, 2);
        assert_eq!(groups[2].trip_id, 1);
        assert_eq!(groups[2].items.len(), 1);
    }

    #[test]
    fn grouping_keeps_served_order_for_equal_timestamps() {
        let records = vec![update(10, 3, 5), update(11, 3, 5), update(12, 4, 5)];
        let groups = group_updates(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].items.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![10, 11]
        );
    }

    #[test]
    fn missing_watermark_means_everything_unread() {
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::new(MemoryStore::new()), clock);
        futures::executor::block_on(tracker.resolve_watermark());

        let records = vec![update(1, 1, 0), update(2, 1, 500)];
        assert_eq!(tracker.unread_count(&records), 2);
    }

    #[test]
    fn opening_the_panel_persists_a_local_watermark() {
        let store = Rc::new(MemoryStore::new());
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::clone(&store), Rc::clone(&clock));

        futures::executor::block_on(async {
            tracker.resolve_watermark().await;
            tracker.set_open(true).await;
        });

        assert_eq!(
            store.get(ANONYMOUS_WATERMARK_KEY),
            Some(base_time().to_rfc3339())
        );
        assert_eq!(tracker.watermark(), Some(base_time()));
        // Entries at or before the watermark are read; strictly-later ones
        // stay unread.
        assert!(!tracker.is_unread(&update(1, 1, 0)));
        let later = TripUpdate {
            created_at: base_time() + Duration::seconds(1),
            ..update(2, 1, 0)
        };
        assert!(tracker.is_unread(&later));
    }

    #[test]
    fn watermark_never_moves_backwards() {
        let store = Rc::new(MemoryStore::new());
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::clone(&store), Rc::clone(&clock));

        futures::executor::block_on(async {
            tracker.resolve_watermark().await;
            tracker.set_open(true).await;
            tracker.set_open(false).await;

            clock.set(base_time() - Duration::hours(1));
            tracker.set_open(true).await;
        });

        assert_eq!(tracker.watermark(), Some(base_time()));
        assert_eq!(
            store.get(ANONYMOUS_WATERMARK_KEY),
            Some(base_time().to_rfc3339())
        );
    }

    #[test]
    fn reopening_an_open_panel_does_not_advance() {
        let store = Rc::new(MemoryStore::new());
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::clone(&store), Rc::clone(&clock));

        futures::executor::block_on(async {
            tracker.resolve_watermark().await;
            tracker.set_open(true).await;
            clock.advance(Duration::minutes(5));
            tracker.set_open(true).await;
        });

        assert_eq!(tracker.watermark(), Some(base_time()));
    }

    #[tokio::test]
    async fn authenticated_watermark_is_loaded_from_the_server() {
        let server = MockServer::start_async().await;
        let last_read = base_time() - Duration::minutes(30);
        server.mock(|when, then| {
            when.method(GET).path("/api/notifications/last-read");
            then.status(200)
                .json_body(json!({ "last_read_at": last_read.to_rfc3339() }));
        });

        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = authed_tracker(&server, clock);
        tracker.resolve_watermark().await;

        assert_eq!(tracker.watermark(), Some(last_read));
        assert!(tracker.is_unread(&update(1, 1, 10)));
        assert!(!tracker.is_unread(&update(2, 1, 45)));
    }

    #[tokio::test]
    async fn opening_the_panel_upserts_the_server_watermark_once() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/notifications/last-read");
            then.status(200).json_body(json!({ "last_read_at": null }));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/notifications/last-read")
                .header("x-csrf-token", "csrf-test");
            then.status(200)
                .json_body(json!({ "last_read_at": base_time().to_rfc3339() }));
        });

        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = authed_tracker(&server, clock);
        tracker.resolve_watermark().await;
        tracker.set_open(true).await;
        tracker.set_open(true).await;

        assert_eq!(put.hits(), 1);
        assert_eq!(tracker.watermark(), Some(base_time()));
    }

    #[tokio::test]
    async fn failed_server_load_keeps_everything_unread_and_retries_later() {
        let server = MockServer::start_async().await;
        let get = server.mock(|when, then| {
            when.method(GET).path("/api/notifications/last-read");
            then.status(500);
        });

        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = authed_tracker(&server, clock);
        tracker.resolve_watermark().await;

        assert_eq!(tracker.watermark(), None);
        assert!(tracker.is_unread(&update(1, 1, 120)));

        tracker.resolve_watermark().await;
        assert!(get.hits() >= 2);
    }

    #[tokio::test]
    async fn failed_persist_still_advances_the_local_watermark() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/notifications/last-read");
            then.status(200).json_body(json!({ "last_read_at": null }));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/api/notifications/last-read");
            then.status(500);
        });

        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = authed_tracker(&server, clock);
        tracker.resolve_watermark().await;
        tracker.set_open(true).await;

        assert_eq!(tracker.watermark(), Some(base_time()));
    }

    #[tokio::test]
    async fn load_updates_publishes_feed_and_unread_count() {
        let server = MockServer::start_async().await;
        let feed = json!([
            {
                "id": 1,
                "trip_id": 1,
                "title": "Itinerary change",
                "description": "New port call",
                "created_at": base_time().to_rfc3339(),
                "trip_name": "Alaska 2026",
                "trip_slug": "alaska-2026"
            }
        ]);
        server.mock(|when, then| {
            when.method(GET).path("/api/updates");
            then.status(200).json_body(feed.clone());
        });

        let runtime = leptos::create_runtime();
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::new(MemoryStore::new()), Rc::clone(&clock));
        let provider: Rc<dyn SessionProvider> = Rc::new(StaticSessionProvider::anonymous());
        let api = Rc::new(ApiClient::new_with_base_url(
            server.base_url(),
            Rc::clone(&provider),
            Rc::new(FixedNetworkStatus::online()),
            Rc::new(MemoryCookieStore::new()),
        ));
        let cache = Rc::new(QueryCache::new(
            Rc::clone(&clock) as Rc<dyn Clock>,
            Rc::new(QueueSpawner::new()),
        ));
        let (state, set_state) = use_notifications();

        load_updates(&tracker, &cache, api, set_state).await.unwrap();

        let snapshot = state.get_untracked();
        assert_eq!(snapshot.updates.len(), 1);
        assert_eq!(snapshot.unread_count, 1);
        assert!(!snapshot.loading);

        set_panel_open(&tracker, set_state, true).await;
        let snapshot = state.get_untracked();
        assert!(snapshot.panel_open);
        assert_eq!(snapshot.unread_count, 0);

        runtime.dispose();
    }

    // Multi-thread flavor so the worker threads drive request IO while the
    // queued revalidation is blocked on.
    #[tokio::test(flavor = "multi_thread")]
    async fn remounting_revalidates_a_fresh_feed() {
        let server = MockServer::start_async().await;
        let feed = server.mock(|when, then| {
            when.method(GET).path("/api/updates");
            then.status(200).json_body(json!([]));
        });

        let runtime = leptos::create_runtime();
        let clock = Rc::new(ManualClock::new(base_time()));
        let tracker = anonymous_tracker(Rc::new(MemoryStore::new()), Rc::clone(&clock));
        let provider: Rc<dyn SessionProvider> = Rc::new(StaticSessionProvider::anonymous());
        let api = Rc::new(ApiClient::new_with_base_url(
            server.base_url(),
            Rc::clone(&provider),
            Rc::new(FixedNetworkStatus::online()),
            Rc::new(MemoryCookieStore::new()),
        ));
        let spawner = Rc::new(QueueSpawner::new());
        let cache = Rc::new(QueryCache::new(
            Rc::clone(&clock) as Rc<dyn Clock>,
            Rc::clone(&spawner) as Rc<dyn crate::utils::spawn::Spawner>,
        ));
        let (_state, set_state) = use_notifications();

        load_updates(&tracker, &cache, Rc::clone(&api), set_state)
            .await
            .unwrap();
        assert_eq!(feed.hits(), 1);

        // A second mount inside the freshness window still refetches.
        clock.advance(Duration::minutes(1));
        load_updates(&tracker, &cache, api, set_state).await.unwrap();
        spawner.run_until_idle();
        assert_eq!(feed.hits(), 2);

        runtime.dispose();
    }
}
