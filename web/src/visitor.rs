use async_trait::async_trait;
use domain::error::{DomainErrorKind, Error as DomainError, InternalErrorKind};
use domain::visitor::Visitor;
use domain::{users, AuthSession};

/// Lets the flow read and log in the session's user.
pub(crate) struct SessionVisitor<'a>(pub &'a mut AuthSession);

#[async_trait]
impl Visitor for SessionVisitor<'_> {
    fn user(&self) -> Option<&users::Model> {
        self.0.user.as_ref()
    }

    async fn login(&mut self, user: &users::Model) -> Result<(), DomainError> {
        self.0.login(user).await.map_err(|login_error| DomainError {
            source: Some(Box::new(login_error)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Session login failed".to_string(),
            )),
        })
    }
}
