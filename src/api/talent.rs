use serde_json::Value;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, Talent},
};

impl ApiClient {
    pub async fn list_talent(&self) -> Result<Vec<Talent>, ApiError> {
        self.json("/api/talent", RequestOptions::get()).await
    }

    pub async fn get_talent(&self, id: i64) -> Result<Talent, ApiError> {
        self.json(&format!("/api/talent/{}", id), RequestOptions::get())
            .await
    }

    pub async fn create_talent(&self, payload: &Value) -> Result<Talent, ApiError> {
        self.json("/api/admin/talent", RequestOptions::post(payload.clone()))
            .await
    }

    pub async fn update_talent(&self, id: i64, payload: &Value) -> Result<Talent, ApiError> {
        self.json(
            &format!("/api/admin/talent/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }

    pub async fn delete_talent(&self, id: i64) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/talent/{}", id),
            RequestOptions::delete(),
        )
        .await
    }
}
