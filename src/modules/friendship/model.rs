use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Derived state of an unordered user pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PairState {
    None,
    Pending { initiator: Uuid },
    Friends,
    Blocked { blocker: Uuid },
}

/// The two users an engine operation acts on. Every pair operation
/// validates one before opening its transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_distinct_users"))]
pub struct UserPairBody {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

fn validate_distinct_users(body: &UserPairBody) -> Result<(), ValidationError> {
    if body.from_user_id == body.to_user_id {
        let mut err = ValidationError::new("self_relationship");
        err.message = Some("A user cannot have a relationship with themselves".into());
        return Err(err);
    }
    Ok(())
}
