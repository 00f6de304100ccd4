use serde_json::{json, Value};

use super::{
    client::{ApiClient, RequestOptions},
    types::{ApiError, Role, UserAccount},
};

impl ApiClient {
    pub async fn list_users(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.json("/api/admin/users", RequestOptions::get()).await
    }

    pub async fn create_user(&self, payload: &Value) -> Result<UserAccount, ApiError> {
        self.json("/api/admin/users", RequestOptions::post(payload.clone()))
            .await
    }

    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<UserAccount, ApiError> {
        self.json(
            &format!("/api/admin/users/{}/role", id),
            RequestOptions::put(json!({ "role": role })),
        )
        .await
    }

    pub async fn deactivate_user(&self, id: &str) -> Result<Value, ApiError> {
        self.json(
            &format!("/api/admin/users/{}", id),
            RequestOptions::delete(),
        )
        .await
    }
}
