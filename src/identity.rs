//! Caller identity.
//!
//! Authentication happens upstream; this crate only ever sees "an
//! authenticated user id, or nobody".

use crate::error::InteractionError;
use crate::model::UserId;
use crate::storage::ContentStore;

/// The identity attached to an incoming operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor(Option<UserId>);

impl Actor {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(id: UserId) -> Self {
        Self(Some(id))
    }

    pub fn id(&self) -> Option<UserId> {
        self.0
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    /// The user id, or `Unauthorized` for anonymous callers.
    pub fn require(&self) -> Result<UserId, InteractionError> {
        self.0.ok_or(InteractionError::Unauthorized)
    }

    /// The user id, provided it belongs to a registered account.
    ///
    /// An identity with no users row is as good as no identity at all.
    pub async fn require_account(
        &self,
        content: &dyn ContentStore,
    ) -> Result<UserId, InteractionError> {
        let id = self.require()?;
        match content.get_user(id).await? {
            Some(_) => Ok(id),
            None => Err(InteractionError::Unauthorized),
        }
    }
}

impl From<UserId> for Actor {
    fn from(id: UserId) -> Self {
        Self::user(id)
    }
}

impl From<Option<UserId>> for Actor {
    fn from(id: Option<UserId>) -> Self {
        Self(id)
    }
}
