use crate::error::HandlerError;

/// Users are identified by their email address.
pub type UserId = String;

/// Requests may name the user they act for. The name must match the authenticated user.
pub fn ensure_same_user(user_id: &UserId, claimed: Option<&str>) -> Result<(), HandlerError> {
    match claimed {
        Some(claimed) if claimed != user_id => Err(HandlerError::Forbidden),
        _ => Ok(()),
    }
}
