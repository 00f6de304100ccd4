use serde_json::Value;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, Location},
};

impl ApiClient {
    pub async fn list_locations(&self) -> Result<Vec<Location>, ApiError> {
        self.json("/api/locations", RequestOptions::get()).await
    }

    pub async fn create_location(&self, payload: &Value) -> Result<Location, ApiError> {
        self.json(
            "/api/admin/locations",
            RequestOptions::post(payload.clone()),
        )
        .await
    }

    pub async fn update_location(&self, id: i64, payload: &Value) -> Result<Location, ApiError> {
        self.json(
            &format!("/api/admin/locations/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }

    pub async fn delete_location(&self, id: i64) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/locations/{}", id),
            RequestOptions::delete(),
        )
        .await
    }
}
