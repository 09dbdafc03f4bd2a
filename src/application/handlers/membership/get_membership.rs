//! GetMembershipHandler - Query handler for retrieving membership details.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::membership::MembershipError;
use crate::ports::{MembershipReader, MembershipView};

/// Query to get a user's membership.
#[derive(Debug, Clone)]
pub struct GetMembershipQuery {
    pub user_id: UserId,
}

/// Result of successful membership query.
pub type GetMembershipResult = Option<MembershipView>;

/// Handler for retrieving membership details.
///
/// Returns the full membership view for UI display, or `None` if the user
/// has no membership record. Callers that need a tier anyway (the HTTP
/// layer) synthesize a free-tier payload from `None`.
pub struct GetMembershipHandler {
    reader: Arc<dyn MembershipReader>,
}

impl GetMembershipHandler {
    pub fn new(reader: Arc<dyn MembershipReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetMembershipQuery,
    ) -> Result<GetMembershipResult, MembershipError> {
        self.reader
            .get_by_user(&query.user_id)
            .await
            .map_err(|e| MembershipError::infrastructure(e.to_string()))
    }
}
