use thiserror::Error;

use comments_boundary::{CommentCreated, CommentId, NewComment};

use crate::{
    api::{ApiError, CommentsApi},
    file::{AttachedFile, DataUrlError},
    sanitize::sanitize_html,
    validate::{validate_draft, Validation},
};

pub const MSG_CAPTCHA_REQUIRED: &str = "Please verify that you are not a robot.";

/// In-progress, unsaved comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub parent: Option<CommentId>,
    pub file: Option<AttachedFile>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("The comment is invalid")]
    Invalid(Validation),
    #[error("Please verify that you are not a robot.")]
    CaptchaRequired,
    #[error(transparent)]
    Attachment(#[from] DataUrlError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Turns a draft into a request payload.
///
/// Nothing is sent if the draft is invalid or not verified by a CAPTCHA.
pub fn prepare_comment(draft: &Draft) -> Result<NewComment, SubmitError> {
    let validation = validate_draft(draft);
    if !validation.is_valid() {
        return Err(SubmitError::Invalid(validation));
    }
    let captcha = draft
        .captcha_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(SubmitError::CaptchaRequired)?
        .to_string();
    let attachment = draft
        .file
        .as_ref()
        .map(AttachedFile::to_new_attachment)
        .transpose()?;
    Ok(NewComment {
        text: sanitize_html(&draft.text),
        parent_comment: draft.parent,
        attachment,
        captcha,
    })
}

pub async fn submit_comment<A>(api: &A, draft: &Draft) -> Result<CommentCreated, SubmitError>
where
    A: CommentsApi + ?Sized,
{
    let comment = prepare_comment(draft)?;
    log::debug!(
        "Submit comment (reply to {:?}, attachment: {})",
        comment.parent_comment,
        comment.attachment.is_some()
    );
    Ok(api.create_comment(&comment).await?)
}
