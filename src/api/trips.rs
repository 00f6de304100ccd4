use serde_json::Value;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, Trip, TripInfoSection},
};

fn trip_list_path(status: Option<&str>, trip_type: Option<&str>) -> String {
    let mut params = Vec::new();
    if let Some(status) = status {
        params.push(format!("status={}", status));
    }
    if let Some(trip_type) = trip_type {
        params.push(format!("trip_type={}", trip_type));
    }
    if params.is_empty() {
        "/api/trips".to_string()
    } else {
        format!("/api/trips?{}", params.join("&"))
    }
}

impl ApiClient {
    pub async fn list_trips(&self) -> Result<Vec<Trip>, ApiError> {
        self.json("/api/trips", RequestOptions::get()).await
    }

    pub async fn list_trips_filtered(
        &self,
        status: Option<&str>,
        trip_type: Option<&str>,
    ) -> Result<Vec<Trip>, ApiError> {
        self.json(&trip_list_path(status, trip_type), RequestOptions::get())
            .await
    }

    pub async fn get_trip_by_slug(&self, slug: &str) -> Result<Trip, ApiError> {
        self.json(&format!("/api/trips/slug/{}", slug), RequestOptions::get())
            .await
    }

    pub async fn create_trip(&self, payload: &Value) -> Result<Trip, ApiError> {
        self.json("/api/admin/trips", RequestOptions::post(payload.clone()))
            .await
    }

    pub async fn update_trip(&self, id: i64, payload: &Value) -> Result<Trip, ApiError> {
        self.json(
            &format!("/api/admin/trips/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }

    pub async fn delete_trip(&self, id: i64) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/trips/{}", id),
            RequestOptions::delete(),
        )
        .await
    }

    pub async fn list_trip_info_sections(&self) -> Result<Vec<TripInfoSection>, ApiError> {
        self.json("/api/trip-info-sections", RequestOptions::get())
            .await
    }

    pub async fn update_trip_info_section(
        &self,
        id: i64,
        payload: &Value,
    ) -> Result<TripInfoSection, ApiError> {
        self.json(
            &format!("/api/admin/trip-info-sections/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }
}
