use uuid::Uuid;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};

const MAX_ID_LEN: usize = 128;

/// Fresh id for a profile, post, or favorite.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Ids double as directory and file names in the file store, so only a
/// conservative character set is accepted. A leading `_` is reserved for
/// internal directories.
pub fn validate_id(kind: &str, id: &str) -> AppResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && !id.starts_with('_')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::InvalidId, format!("invalid {kind} id '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_slugs_and_uuids() {
        assert!(validate_id("profile", "jane_doe-42").is_ok());
        assert!(validate_id("profile", &new_id()).is_ok());
    }

    #[test]
    fn rejects_path_tricks() {
        for bad in ["", "..", "a/b", "_users", ".hidden", "a b", "ä", &"x".repeat(129)] {
            assert!(validate_id("profile", bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
