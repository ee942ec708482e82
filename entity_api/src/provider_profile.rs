use super::error::Error;
use entity::provider::Provider;
use entity::provider_profiles::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::debug;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    ConnectionTrait, TryIntoModel,
};

/// Token fields copied into a profile after every successful callback.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tokens {
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTimeUtc>,
}

/// Creates a profile holding only the remote identity; tokens and user are attached later.
pub async fn create(
    db: &impl ConnectionTrait,
    provider: Provider,
    remote_uid: &str,
) -> Result<Model, Error> {
    debug!("Creating {provider} profile for remote uid: {remote_uid}");

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        provider: Set(provider),
        user_id: Set(None),
        remote_uid: Set(remote_uid.to_string()),
        access_token: Set(None),
        access_token_secret: Set(None),
        refresh_token: Set(None),
        token_expires_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

/// Finds the profile for a remote identity (unique per provider)
pub async fn find_by_remote_uid(
    db: &impl ConnectionTrait,
    provider: Provider,
    remote_uid: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Provider.eq(provider))
        .filter(Column::RemoteUid.eq(remote_uid))
        .one(db)
        .await?)
}

/// Finds the profile a local user has connected for a provider
pub async fn find_by_user_and_provider(
    db: &impl ConnectionTrait,
    user_id: Id,
    provider: Provider,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Provider.eq(provider))
        .one(db)
        .await?)
}

/// Replaces the cached tokens on an existing profile
pub async fn update_tokens(
    db: &impl ConnectionTrait,
    id: Id,
    tokens: Tokens,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;

    debug!("Updating {} profile tokens: {id}", existing.provider);

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        provider: Unchanged(existing.provider),
        user_id: Unchanged(existing.user_id),
        remote_uid: Unchanged(existing.remote_uid),
        access_token: Set(tokens.access_token),
        access_token_secret: Set(tokens.access_token_secret),
        refresh_token: Set(tokens.refresh_token),
        token_expires_at: Set(tokens.token_expires_at.map(|t| t.into())),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Links a profile to a local user
pub async fn attach_user(db: &impl ConnectionTrait, id: Id, user_id: Id) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;

    debug!(
        "Attaching {} profile {id} to user: {user_id}",
        existing.provider
    );

    let mut active_model: ActiveModel = existing.into();
    active_model.user_id = Set(Some(user_id));
    active_model.updated_at = Set(chrono::Utc::now().into());

    Ok(active_model.update(db).await?.try_into_model()?)
}

pub async fn delete(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    debug!("Deleting provider profile: {id}");
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}
