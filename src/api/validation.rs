use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(ApiError::validation)
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid && !username.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("long enough").is_ok());
        assert!(validate_password_len("ééééééé").is_err());
    }

    #[test]
    fn username_charset() {
        assert!(validate_username("ada.obi_2").is_ok());
        assert!(validate_username("ada obi").is_err());
        assert!(validate_username("").is_err());
    }
}
