use serde::{Deserialize, Serialize};

use super::RemoteId;

/// Body of `GET /organization/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: RemoteId,
    pub name: String,
}
