//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest room identifier accepted from clients.
const MAX_ROOM_ID_LENGTH: usize = 64;

/// Validates that a room identifier is non-empty, at most 64 characters, and
/// built only from lowercase alphanumerics, `_`, or `-`.
///
/// # Examples
///
/// ```ignore
/// validate_room_id("global")       // Ok
/// validate_room_id("global_arena") // Ok
/// validate_room_id("")             // Err - empty
/// validate_room_id("Global Race")  // Err - uppercase and space
/// ```
pub fn validate_room_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_ROOM_ID_LENGTH {
        let mut err = ValidationError::new("room_id_length");
        err.message = Some(
            format!(
                "Room ID must be between 1 and {MAX_ROOM_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("room_id_format");
        err.message =
            Some("Room ID must contain only lowercase alphanumerics, `_`, or `-`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_id_valid() {
        assert!(validate_room_id("global").is_ok());
        assert!(validate_room_id("global_arena").is_ok());
        assert!(validate_room_id("room-42").is_ok());
    }

    #[test]
    fn test_validate_room_id_invalid_length() {
        assert!(validate_room_id("").is_err()); // empty
        assert!(validate_room_id(&"a".repeat(65)).is_err()); // too long
    }

    #[test]
    fn test_validate_room_id_invalid_format() {
        assert!(validate_room_id("Global").is_err()); // uppercase
        assert!(validate_room_id("room 42").is_err()); // space
        assert!(validate_room_id("räce").is_err()); // non-ascii
    }
}
