use serde::Deserialize;
use validator::Validate;

/// Signup form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupFormDto {
    #[validate(
        length(min = 3, max = 30, message = "Username must be 3-30 characters"),
        regex(
            path = "*crate::shared::validation::USERNAME_REGEX",
            message = "Username must start with a letter or underscore and contain only letters, digits and underscores"
        )
    )]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginFormDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, password: &str) -> SignupFormDto {
        SignupFormDto {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_signup() {
        assert!(signup("delta_student", "delta@example.com", "password123")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(signup("ab", "a@example.com", "password123").validate().is_err());
        assert!(signup("9lives", "a@example.com", "password123").validate().is_err());
        assert!(signup("user-name", "a@example.com", "password123").validate().is_err());
        assert!(signup(&"a".repeat(31), "a@example.com", "password123")
            .validate()
            .is_err());
    }

    #[test]
    fn test_email_and_password_rules() {
        assert!(signup("wanderer", "not-an-email", "password123").validate().is_err());
        assert!(signup("wanderer", "a@example.com", "short").validate().is_err());
    }
}
