use serde_json::Value;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, Ship},
};

impl ApiClient {
    pub async fn list_ships(&self) -> Result<Vec<Ship>, ApiError> {
        self.json("/api/ships", RequestOptions::get()).await
    }

    pub async fn get_ship(&self, id: i64) -> Result<Ship, ApiError> {
        self.json(&format!("/api/ships/{}", id), RequestOptions::get())
            .await
    }

    pub async fn create_ship(&self, payload: &Value) -> Result<Ship, ApiError> {
        self.json("/api/admin/ships", RequestOptions::post(payload.clone()))
            .await
    }

    pub async fn update_ship(&self, id: i64, payload: &Value) -> Result<Ship, ApiError> {
        self.json(
            &format!("/api/admin/ships/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }

    pub async fn delete_ship(&self, id: i64) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/ships/{}", id),
            RequestOptions::delete(),
        )
        .await
    }
}
