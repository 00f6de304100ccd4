use chrono::{DateTime, Utc};
use serde_json::json;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, NotificationWatermark, TripUpdate},
};

impl ApiClient {
    /// The trip-announcement feed, newest entries first as served.
    pub async fn list_trip_updates(&self) -> Result<Vec<TripUpdate>, ApiError> {
        self.json("/api/updates", RequestOptions::get()).await
    }

    /// Reads the per-identity watermark row. Scoping to the caller happens
    /// server-side off the bearer credential.
    pub async fn get_notification_watermark(&self) -> Result<NotificationWatermark, ApiError> {
        self.json(
            "/api/notifications/last-read",
            RequestOptions::get().with_auth(),
        )
        .await
    }

    /// Upserts the watermark row for the authenticated identity.
    pub async fn put_notification_watermark(
        &self,
        last_read_at: DateTime<Utc>,
    ) -> Result<NotificationWatermark, ApiError> {
        self.json(
            "/api/notifications/last-read",
            RequestOptions::put(json!({ "last_read_at": last_read_at })).with_auth(),
        )
        .await
    }
}
