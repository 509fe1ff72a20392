use crate::error::ManagerError;

/// Check a UID has a shape the game issues: nine digits whose first is not
/// 0 or 4, or ten digits starting with 18.
pub fn validate_uid(uid: u64) -> Result<u64, ManagerError> {
    let digits = uid.to_string();
    let valid = match digits.len() {
        9 => !digits.starts_with('0') && !digits.starts_with('4'),
        10 => digits.starts_with("18"),
        _ => false,
    };
    if valid {
        Ok(uid)
    } else {
        Err(ManagerError::InvalidUid(digits))
    }
}

/// Enka profile usernames. Kept conservative since they become path segments.
pub fn validate_username(username: &str) -> Result<&str, ManagerError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && username != "."
        && username != "..";
    if valid {
        Ok(username)
    } else {
        Err(ManagerError::InvalidUsername(username.to_string()))
    }
}

pub fn validate_hash(hash: &str) -> Result<&str, ManagerError> {
    if !hash.is_empty() && hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(hash)
    } else {
        Err(ManagerError::InvalidHash(hash.to_string()))
    }
}
