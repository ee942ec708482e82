//! Persistence seams of the flow: provider profiles and local users.

use crate::error::Error;
use crate::{provider::Provider, provider_profiles, users, Id};
use async_trait::async_trait;
use entity_api::provider_profile::{self, Tokens};
use entity_api::user;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Fields of a local user created by the setup step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<Option<provider_profiles::Model>, Error>;

    async fn find_profile_for_user(
        &self,
        user_id: Id,
        provider: Provider,
    ) -> Result<Option<provider_profiles::Model>, Error>;

    /// Fails with a conflict when another request already created the profile.
    async fn create_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<provider_profiles::Model, Error>;

    async fn update_tokens(
        &self,
        id: Id,
        tokens: Tokens,
    ) -> Result<provider_profiles::Model, Error>;

    async fn attach_user(&self, id: Id, user_id: Id) -> Result<provider_profiles::Model, Error>;

    async fn delete_profile(&self, id: Id) -> Result<(), Error>;
}

/// Lookups are case-insensitive.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Id) -> Result<Option<users::Model>, Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, Error>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<users::Model>, Error>;

    async fn create_user(&self, new_user: NewUser) -> Result<users::Model, Error>;

    async fn activate_user(&self, id: Id) -> Result<users::Model, Error>;
}

/// Both stores over the application database.
#[derive(Debug, Clone)]
pub struct DbStore {
    db: Arc<DatabaseConnection>,
}

impl DbStore {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self { db: Arc::clone(db) }
    }
}

#[async_trait]
impl ProfileStore for DbStore {
    async fn find_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<Option<provider_profiles::Model>, Error> {
        Ok(provider_profile::find_by_remote_uid(self.db.as_ref(), provider, remote_uid).await?)
    }

    async fn find_profile_for_user(
        &self,
        user_id: Id,
        provider: Provider,
    ) -> Result<Option<provider_profiles::Model>, Error> {
        Ok(provider_profile::find_by_user_and_provider(self.db.as_ref(), user_id, provider).await?)
    }

    async fn create_profile(
        &self,
        provider: Provider,
        remote_uid: &str,
    ) -> Result<provider_profiles::Model, Error> {
        Ok(provider_profile::create(self.db.as_ref(), provider, remote_uid).await?)
    }

    async fn update_tokens(
        &self,
        id: Id,
        tokens: Tokens,
    ) -> Result<provider_profiles::Model, Error> {
        Ok(provider_profile::update_tokens(self.db.as_ref(), id, tokens).await?)
    }

    async fn attach_user(&self, id: Id, user_id: Id) -> Result<provider_profiles::Model, Error> {
        Ok(provider_profile::attach_user(self.db.as_ref(), id, user_id).await?)
    }

    async fn delete_profile(&self, id: Id) -> Result<(), Error> {
        Ok(provider_profile::delete(self.db.as_ref(), id).await?)
    }
}

#[async_trait]
impl UserStore for DbStore {
    async fn find_user_by_id(&self, id: Id) -> Result<Option<users::Model>, Error> {
        match user::find_by_id(self.db.as_ref(), id).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.error_kind == entity_api::error::EntityApiErrorKind::RecordNotFound => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, Error> {
        Ok(user::find_by_email(self.db.as_ref(), email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<users::Model>, Error> {
        Ok(user::find_by_username(self.db.as_ref(), username).await?)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<users::Model, Error> {
        let now = chrono::Utc::now();
        let model = users::Model {
            id: Id::new_v4(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password: None,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        };

        Ok(user::create(self.db.as_ref(), model).await?)
    }

    async fn activate_user(&self, id: Id) -> Result<users::Model, Error> {
        Ok(user::activate(self.db.as_ref(), id).await?)
    }
}

#[cfg(test)]
// seaORM's mock feature removes the Clone impl from DatabaseConnection,
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn profile() -> provider_profiles::Model {
        let now = chrono::Utc::now();
        provider_profiles::Model {
            id: Id::new_v4(),
            provider: Provider::GitHub,
            user_id: None,
            remote_uid: "583231".to_string(),
            access_token: Some("tok".to_string()),
            access_token_secret: None,
            refresh_token: None,
            token_expires_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_profile_reads_through_entity_api() -> Result<(), Error> {
        let expected = profile();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![expected.clone()]])
            .into_connection();
        let store = DbStore::new(&Arc::new(db));

        let found = store.find_profile(Provider::GitHub, "583231").await?;

        assert_eq!(found, Some(expected));
        Ok(())
    }

    #[tokio::test]
    async fn missing_user_is_none() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<users::Model>::new()])
            .into_connection();
        let store = DbStore::new(&Arc::new(db));

        assert_eq!(store.find_user_by_id(Id::new_v4()).await?, None);
        Ok(())
    }
}
