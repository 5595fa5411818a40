//! Submission drafts and field-level validation.
//!
//! Drafts carry raw form input. Validation yields either a clean draft the
//! application layer can persist, or per-field errors the presentation layer
//! renders back into the form.

use bytes::Bytes;
use uuid::Uuid;

/// A pending image attachment, as received from the form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw post form input before validation.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<ImageUpload>,
}

/// Raw comment form input before validation.
#[derive(Debug, Clone, Default)]
pub struct CommentDraft {
    pub text: String,
}

/// Per-field validation errors, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none()
    }
}

pub const TEXT_REQUIRED: &str = "Text is required.";
pub const GROUP_UNKNOWN: &str = "Selected group does not exist.";

impl PostDraft {
    /// Validate field contents that do not need repository access.
    ///
    /// Group existence is checked by the application layer, which can reach
    /// the groups repository; a failed lookup lands in `FieldErrors::group`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.text.trim().is_empty() {
            errors.text = Some(TEXT_REQUIRED);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        if self.text.trim().is_empty() {
            Err(FieldErrors {
                text: Some(TEXT_REQUIRED),
                group: None,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_post_text_is_rejected() {
        let draft = PostDraft::default();
        let errors = draft.validate().expect_err("empty text rejected");
        assert_eq!(errors.text, Some(TEXT_REQUIRED));
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let draft = PostDraft {
            text: "   \n\t".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn post_without_group_or_image_is_valid() {
        let draft = PostDraft {
            text: "a post".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn empty_comment_is_rejected() {
        assert!(CommentDraft::default().validate().is_err());
        let ok = CommentDraft {
            text: "a comment".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
