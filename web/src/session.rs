//! Typed access to the flow state and flash notices kept in the visitor's session.

use crate::error::{Error, Result};
use domain::flow_session::FlowSession;
use domain::notice::Notice;
use tower_sessions::Session;

const NOTICES_KEY: &str = "socialnetworks:notices";

pub(crate) async fn load_flow(session: &Session, slug: &str) -> Result<FlowSession> {
    Ok(session
        .get::<FlowSession>(&FlowSession::key(slug))
        .await
        .map_err(|err| Error::internal("Failed to read flow session", err))?
        .unwrap_or_default())
}

/// Persists the flow state. An emptied flow removes its key.
pub(crate) async fn store_flow(session: &Session, slug: &str, flow: &FlowSession) -> Result<()> {
    let key = FlowSession::key(slug);
    if flow.is_empty() {
        session
            .remove::<FlowSession>(&key)
            .await
            .map_err(|err| Error::internal("Failed to clear flow session", err))?;
    } else {
        session
            .insert(&key, flow)
            .await
            .map_err(|err| Error::internal("Failed to write flow session", err))?;
    }
    Ok(())
}

pub(crate) async fn push_notices(session: &Session, notices: Vec<Notice>) -> Result<()> {
    if notices.is_empty() {
        return Ok(());
    }

    let mut pending = session
        .get::<Vec<Notice>>(NOTICES_KEY)
        .await
        .map_err(|err| Error::internal("Failed to read notices", err))?
        .unwrap_or_default();
    pending.extend(notices);

    session
        .insert(NOTICES_KEY, pending)
        .await
        .map_err(|err| Error::internal("Failed to write notices", err))
}

/// Pending notices, oldest first. Each notice is returned once.
pub(crate) async fn take_notices(session: &Session) -> Result<Vec<Notice>> {
    Ok(session
        .remove::<Vec<Notice>>(NOTICES_KEY)
        .await
        .map_err(|err| Error::internal("Failed to read notices", err))?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn notices_are_taken_once() {
        let session = session();
        push_notices(&session, vec![Notice::connected("GitHub")])
            .await
            .unwrap();
        push_notices(&session, vec![Notice::disconnected("GitHub")])
            .await
            .unwrap();

        let notices = take_notices(&session).await.unwrap();

        assert_eq!(
            notices,
            vec![Notice::connected("GitHub"), Notice::disconnected("GitHub")]
        );
        assert!(take_notices(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flow_state_is_kept_per_provider() {
        let session = session();
        let flow = FlowSession {
            next_url: Some("/home".to_string()),
            oauth_state: Some("s1".to_string()),
            ..Default::default()
        };

        store_flow(&session, "github", &flow).await.unwrap();

        assert_eq!(load_flow(&session, "github").await.unwrap(), flow);
        assert!(load_flow(&session, "twitter").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_flow_state_removes_the_key() {
        let session = session();
        let flow = FlowSession {
            next_url: Some("/home".to_string()),
            ..Default::default()
        };
        store_flow(&session, "github", &flow).await.unwrap();

        store_flow(&session, "github", &FlowSession::default())
            .await
            .unwrap();

        assert_eq!(
            session
                .get::<FlowSession>("socialnetworks:github")
                .await
                .unwrap(),
            None
        );
    }
}
