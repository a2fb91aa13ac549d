use serde::Deserialize;
use validator::Validate;

/// Review form posted from the listing page
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewFormDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters"
    ))]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i16, comment: &str) -> ReviewFormDto {
        ReviewFormDto {
            rating,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(review(1, "ok").validate().is_ok());
        assert!(review(5, "ok").validate().is_ok());
        assert!(review(0, "ok").validate().is_err());
        assert!(review(6, "ok").validate().is_err());
    }

    #[test]
    fn test_comment_bounds() {
        assert!(review(3, "").validate().is_err());
        assert!(review(3, &"a".repeat(2000)).validate().is_ok());
        assert!(review(3, &"a".repeat(2001)).validate().is_err());
    }
}
