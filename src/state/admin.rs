use std::rc::Rc;

use serde_json::Value;

use crate::api::client::ApiClient;
use crate::api::types::{
    ApiError, Location, PartyTheme, Role, Ship, Talent, Trip, TripInfoSection, UserAccount,
};
use crate::cache::{keys, QueryCache};

/// Write path for the admin screens. Every mutation goes through the cache
/// so the resource family it touches is stale before the caller re-renders.
pub struct AdminRepository {
    cache: Rc<QueryCache>,
    api: Rc<ApiClient>,
}

impl AdminRepository {
    pub fn new(cache: Rc<QueryCache>, api: Rc<ApiClient>) -> Self {
        Self { cache, api }
    }

    pub async fn save_trip(&self, id: Option<i64>, payload: &Value) -> Result<Trip, ApiError> {
        let mutation = async {
            match id {
                Some(id) => self.api.update_trip(id, payload).await,
                None => self.api.create_trip(payload).await,
            }
        };
        self.cache.mutate(&[keys::trips()], mutation).await
    }

    pub async fn delete_trip(&self, id: i64) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::trips()], self.api.delete_trip(id))
            .await
    }

    pub async fn save_ship(&self, id: Option<i64>, payload: &Value) -> Result<Ship, ApiError> {
        let mutation = async {
            match id {
                Some(id) => self.api.update_ship(id, payload).await,
                None => self.api.create_ship(payload).await,
            }
        };
        self.cache.mutate(&[keys::ships()], mutation).await
    }

    pub async fn delete_ship(&self, id: i64) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::ships()], self.api.delete_ship(id))
            .await
    }

    pub async fn save_talent(&self, id: Option<i64>, payload: &Value) -> Result<Talent, ApiError> {
        let mutation = async {
            match id {
                Some(id) => self.api.update_talent(id, payload).await,
                None => self.api.create_talent(payload).await,
            }
        };
        self.cache.mutate(&[keys::talent()], mutation).await
    }

    pub async fn delete_talent(&self, id: i64) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::talent()], self.api.delete_talent(id))
            .await
    }

    pub async fn save_party_theme(
        &self,
        id: Option<i64>,
        payload: &Value,
    ) -> Result<PartyTheme, ApiError> {
        let mutation = async {
            match id {
                Some(id) => self.api.update_party_theme(id, payload).await,
                None => self.api.create_party_theme(payload).await,
            }
        };
        self.cache.mutate(&[keys::party_themes()], mutation).await
    }

    pub async fn delete_party_theme(&self, id: i64) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::party_themes()], self.api.delete_party_theme(id))
            .await
    }

    pub async fn save_location(
        &self,
        id: Option<i64>,
        payload: &Value,
    ) -> Result<Location, ApiError> {
        let mutation = async {
            match id {
                Some(id) => self.api.update_location(id, payload).await,
                None => self.api.create_location(payload).await,
            }
        };
        self.cache.mutate(&[keys::locations()], mutation).await
    }

    pub async fn delete_location(&self, id: i64) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::locations()], self.api.delete_location(id))
            .await
    }

    pub async fn save_trip_info_section(
        &self,
        id: i64,
        payload: &Value,
    ) -> Result<TripInfoSection, ApiError> {
        self.cache
            .mutate(
                &[keys::trip_info_sections()],
                self.api.update_trip_info_section(id, payload),
            )
            .await
    }

    pub async fn create_user(&self, payload: &Value) -> Result<UserAccount, ApiError> {
        self.cache
            .mutate(&[keys::users()], self.api.create_user(payload))
            .await
    }

    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<UserAccount, ApiError> {
        self.cache
            .mutate(&[keys::users()], self.api.set_user_role(id, role))
            .await
    }

    pub async fn deactivate_user(&self, id: &str) -> Result<Value, ApiError> {
        self.cache
            .mutate(&[keys::users()], self.api.deactivate_user(id))
            .await
    }
}
