use crate::error::Error;
use crate::users;
use async_trait::async_trait;

/// The person driving a flow: who they are, and a way to log them in.
#[async_trait]
pub trait Visitor: Send + Sync {
    fn user(&self) -> Option<&users::Model>;

    async fn login(&mut self, user: &users::Model) -> Result<(), Error>;
}
