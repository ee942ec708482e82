use super::error::{EntityApiErrorKind, Error};
use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use chrono::Utc;

use entity::provider::Provider;
use entity::users::{ActiveModel, Column, Entity, Model};
use entity::{provider_profiles, Id};
use log::*;
use sea_orm::{
    entity::prelude::*,
    sea_query::{Expr, Func},
    ConnectionTrait, DatabaseConnection, Set, TryIntoModel,
};
use serde::Deserialize;
use std::sync::Arc;

/// Inserts a new local user. Users created through a provider carry no password.
pub async fn create(db: &impl ConnectionTrait, user_model: Model) -> Result<Model, Error> {
    debug!("New User Model to be inserted: {}", user_model.username);

    let now = Utc::now();
    let user_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        username: Set(user_model.username),
        email: Set(user_model.email),
        first_name: Set(user_model.first_name),
        last_name: Set(user_model.last_name),
        password: Set(user_model.password),
        is_active: Set(user_model.is_active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(user_active_model.insert(db).await?.try_into_model()?)
}

/// Case-insensitive lookup by email address
pub async fn find_by_email(db: &impl ConnectionTrait, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Email))).eq(email.to_lowercase()))
        .one(db)
        .await?)
}

/// Case-insensitive lookup by username
pub async fn find_by_username(
    db: &impl ConnectionTrait,
    username: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Username))).eq(username.to_lowercase()))
        .one(db)
        .await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

pub async fn activate(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;

    info!("Activating user: {id}");

    let mut active_model: ActiveModel = existing.into();
    active_model.is_active = Set(true);
    active_model.updated_at = Set(Utc::now().into());

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Resolves the local user linked to a remote identity, if any.
pub async fn find_by_provider_identity(
    db: &impl ConnectionTrait,
    provider: Provider,
    remote_uid: &str,
) -> Result<Option<Model>, Error> {
    let profile = provider_profiles::Entity::find()
        .filter(provider_profiles::Column::Provider.eq(provider))
        .filter(provider_profiles::Column::RemoteUid.eq(remote_uid))
        .one(db)
        .await?;

    match profile.and_then(|p| p.user_id) {
        Some(user_id) => Ok(Entity::find_by_id(user_id).one(db).await?),
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
}

/// A remote identity already verified by a provider callback.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub provider: Provider,
    pub remote_uid: String,
}

impl Backend {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self { db: Arc::clone(db) }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = Model;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match find_by_provider_identity(self.db.as_ref(), creds.provider, &creds.remote_uid).await? {
            Some(user) => Ok(Some(user)),
            None => Err(Error {
                source: None,
                error_kind: EntityApiErrorKind::RecordUnauthenticated,
            }),
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(Entity::find_by_id(*user_id).one(self.db.as_ref()).await?)
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
