use serde_json::Value;

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, PartyTheme},
};

impl ApiClient {
    pub async fn list_party_themes(&self) -> Result<Vec<PartyTheme>, ApiError> {
        self.json("/api/party-themes", RequestOptions::get()).await
    }

    pub async fn create_party_theme(&self, payload: &Value) -> Result<PartyTheme, ApiError> {
        self.json(
            "/api/admin/party-themes",
            RequestOptions::post(payload.clone()),
        )
        .await
    }

    pub async fn update_party_theme(
        &self,
        id: i64,
        payload: &Value,
    ) -> Result<PartyTheme, ApiError> {
        self.json(
            &format!("/api/admin/party-themes/{}", id),
            RequestOptions::put(payload.clone()),
        )
        .await
    }

    pub async fn delete_party_theme(&self, id: i64) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/party-themes/{}", id),
            RequestOptions::delete(),
        )
        .await
    }
}
