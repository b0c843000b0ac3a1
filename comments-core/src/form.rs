//! State of a single comment form.

use comments_boundary::{CommentCreated, CommentId, NewComment};

use crate::{
    api::{ApiError, CommentsApi},
    captcha::{CaptchaEvent, CaptchaState},
    file::{validate_file, AttachedFile, FileConstraints, FileInvalidation},
    sanitize::sanitize_html,
    submit::{prepare_comment, Draft, SubmitError, MSG_CAPTCHA_REQUIRED},
    validate::{validate_draft, Validation, FIELD_TEXT},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    draft: Draft,
    captcha: CaptchaState,
    constraints: FileConstraints,
    validation: Validation,
    file_error: Option<String>,
    captcha_error: Option<String>,
    general_error: Option<String>,
    show_preview: bool,
    submitting: bool,
}

impl CommentForm {
    #[must_use]
    pub fn new(parent: Option<CommentId>) -> Self {
        Self {
            draft: Draft {
                parent,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: FileConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn text(&self) -> &str {
        &self.draft.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub const fn is_reply(&self) -> bool {
        self.draft.parent.is_some()
    }

    pub const fn constraints(&self) -> &FileConstraints {
        &self.constraints
    }

    /// Validates and keeps the file, or records why it was refused.
    pub fn attach(&mut self, file: AttachedFile) -> Result<(), FileInvalidation> {
        match validate_file(&file, &self.constraints) {
            Ok(()) => {
                log::debug!("Attach {} ({})", file.name, file.mime);
                self.draft.file = Some(file);
                self.file_error = None;
                Ok(())
            }
            Err(err) => {
                self.reject_file(err.to_string());
                Err(err)
            }
        }
    }

    /// Records a file that could not be accepted, e.g. because reading it failed.
    pub fn reject_file(&mut self, error: impl Into<String>) {
        self.draft.file = None;
        self.file_error = Some(error.into());
    }

    pub fn remove_file(&mut self) {
        self.draft.file = None;
        self.file_error = None;
    }

    pub const fn file(&self) -> Option<&AttachedFile> {
        self.draft.file.as_ref()
    }

    pub fn file_error(&self) -> Option<&str> {
        self.file_error.as_deref()
    }

    pub fn handle_captcha(&mut self, event: CaptchaEvent) {
        self.captcha = std::mem::take(&mut self.captcha).apply(event);
        self.draft.captcha_token = self.captcha.token().map(ToString::to_string);
        if self.captcha.is_verified() {
            self.captcha_error = None;
        }
    }

    pub const fn captcha(&self) -> &CaptchaState {
        &self.captcha
    }

    pub fn captcha_error(&self) -> Option<&str> {
        self.captcha_error.as_deref()
    }

    pub fn toggle_preview(&mut self) {
        self.show_preview = !self.show_preview;
    }

    pub const fn show_preview(&self) -> bool {
        self.show_preview
    }

    /// Sanitized HTML of the current text.
    pub fn preview_html(&self) -> String {
        sanitize_html(&self.draft.text)
    }

    pub const fn validation(&self) -> &Validation {
        &self.validation
    }

    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    /// Text error followed by all HTML violations.
    pub fn combined_errors(&self) -> Vec<String> {
        self.validation
            .error(FIELD_TEXT)
            .map(ToString::to_string)
            .into_iter()
            .chain(self.validation.html_violations.iter().map(ToString::to_string))
            .collect()
    }

    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn validate(&mut self) -> bool {
        self.validation = validate_draft(&self.draft);
        self.validation.is_valid()
    }

    /// Checks the draft and switches into the submitting state.
    pub fn begin_submit(&mut self) -> Result<NewComment, SubmitError> {
        self.general_error = None;
        let valid = self.validate();
        if self.draft.captcha_token.is_none() {
            self.captcha_error = Some(MSG_CAPTCHA_REQUIRED.to_string());
        }
        if !valid {
            return Err(SubmitError::Invalid(self.validation.clone()));
        }
        let comment = prepare_comment(&self.draft).map_err(|err| {
            if let SubmitError::Attachment(err) = &err {
                self.file_error = Some(err.to_string());
            }
            err
        })?;
        self.submitting = true;
        Ok(comment)
    }

    /// Leaves the submitting state and applies the outcome.
    pub fn finish_submit(
        &mut self,
        result: Result<CommentCreated, ApiError>,
    ) -> Result<CommentCreated, SubmitError> {
        self.submitting = false;
        match result {
            Ok(created) => {
                log::info!("Comment {} created", created.comment_id);
                self.reset();
                Ok(created)
            }
            Err(err) => {
                log::warn!("Comment submission failed: {err}");
                self.apply_api_error(&err);
                Err(err.into())
            }
        }
    }

    pub async fn submit<A>(&mut self, api: &A) -> Result<CommentCreated, SubmitError>
    where
        A: CommentsApi + ?Sized,
    {
        let comment = self.begin_submit()?;
        let result = api.create_comment(&comment).await;
        self.finish_submit(result)
    }

    /// Clears the draft and all feedback, keeping the reply target.
    pub fn reset(&mut self) {
        let parent = self.draft.parent;
        self.draft = Draft {
            parent,
            ..Default::default()
        };
        self.handle_captcha(CaptchaEvent::Reset);
        self.validation = Validation::default();
        self.file_error = None;
        self.captcha_error = None;
        self.general_error = None;
        self.show_preview = false;
    }

    fn apply_api_error(&mut self, err: &ApiError) {
        // the backend has seen (and consumed) the CAPTCHA token
        if matches!(err, ApiError::Validation(_) | ApiError::Server { .. }) {
            self.handle_captcha(CaptchaEvent::Reset);
        }
        match err {
            ApiError::Validation(errors) if !errors.is_empty() => {
                self.validation.errors.clone_from(errors);
            }
            _ => {
                self.general_error = Some(err.user_message());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{api::FieldErrors, submit::tests::FakeApi};

    fn verified_form(text: &str) -> CommentForm {
        let mut form = CommentForm::new(None);
        form.handle_captcha(CaptchaEvent::Rendered);
        form.handle_captcha(CaptchaEvent::Verified("tok".into()));
        form.set_text(text);
        form
    }

    #[test]
    fn reply_forms() {
        assert!(CommentForm::new(Some(3)).is_reply());
        assert!(!CommentForm::new(None).is_reply());
    }

    #[test]
    fn combine_errors() {
        let mut form = CommentForm::new(None);
        form.set_text(" ");
        assert!(!form.validate());
        assert_eq!(form.combined_errors(), vec!["Comment text is required."]);
        form.set_text("<script>x</script> onclick=");
        assert!(!form.validate());
        assert_eq!(
            form.combined_errors(),
            vec![
                "Script tags are not allowed",
                "Event handlers are not allowed"
            ]
        );
    }

    #[test]
    fn reject_invalid_files() {
        let mut form = CommentForm::new(None);
        let err = form
            .attach(AttachedFile::new("x.pdf", "application/pdf", vec![1]))
            .unwrap_err();
        assert!(matches!(err, FileInvalidation::Type { .. }));
        assert!(form.file().is_none());
        assert_eq!(form.file_error(), Some(err.to_string().as_str()));

        form.attach(AttachedFile::new("x.txt", "text/plain", vec![1]))
            .unwrap();
        assert!(form.file().is_some());
        assert_eq!(form.file_error(), None);

        form.remove_file();
        assert!(form.file().is_none());
    }

    #[test]
    fn custom_file_constraints() {
        let mut form = CommentForm::new(None).with_constraints(FileConstraints {
            allowed_types: vec!["text/plain".into()],
            max_size: 2,
        });
        assert!(form
            .attach(AttachedFile::new("big.txt", "text/plain", vec![0; 3]))
            .is_err());
        assert_eq!(
            form.file_error(),
            Some("File is too large. Maximum size is 2 bytes")
        );
    }

    #[test]
    fn preview_is_sanitized() {
        let mut form = CommentForm::new(None);
        form.set_text("<i>x</i><script>y</script>");
        form.toggle_preview();
        assert!(form.show_preview());
        assert_eq!(form.preview_html(), "<i>x</i>");
        // the draft itself is untouched
        assert_eq!(form.text(), "<i>x</i><script>y</script>");
    }

    #[test]
    fn captcha_events_drive_the_token() {
        let mut form = verified_form("x");
        assert_eq!(form.draft().captcha_token.as_deref(), Some("tok"));
        form.handle_captcha(CaptchaEvent::Expired);
        assert_eq!(form.draft().captcha_token, None);
        assert_eq!(form.captcha().message(), Some("CAPTCHA verification expired"));
    }

    #[tokio::test]
    async fn submit_with_token_from_widget_callbacks() {
        let api = FakeApi::default();
        let (mut captcha, widget) = crate::captcha::tests::captcha();
        let mut form = CommentForm::new(None);
        form.set_text("hello");

        // script still loading
        captcha.load();
        for event in captcha.take_events() {
            form.handle_captcha(event);
        }
        assert_eq!(form.captcha(), &CaptchaState::Unloaded);

        // provider called the load callback
        widget.0.borrow_mut().available = true;
        captcha.load();
        for event in captcha.take_events() {
            form.handle_captcha(event);
        }
        assert_eq!(form.captcha(), &CaptchaState::Rendered);

        // user solved the challenge
        let solved = CaptchaEvent::Verified("tok".into());
        captcha.handle(solved.clone());
        form.handle_captcha(solved);

        form.submit(&api).await.unwrap();
        assert_eq!(api.sent.borrow()[0].captcha, "tok");

        captcha.reset();
        for event in captcha.take_events() {
            form.handle_captcha(event);
        }
        assert_eq!(form.captcha(), &CaptchaState::Rendered);
        assert_eq!(form.draft().captcha_token, None);
    }

    #[tokio::test]
    async fn keep_captcha_token_if_request_was_not_sent() {
        let api = FakeApi::default();
        *api.create_result.borrow_mut() = Some(Err(ApiError::Request("bad url".into())));
        let mut form = verified_form("hello");
        form.submit(&api).await.unwrap_err();
        assert_eq!(form.draft().captcha_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn refuse_locally_without_captcha() {
        let api = FakeApi::default();
        let mut form = CommentForm::new(None);
        form.set_text("valid text");
        let err = form.submit(&api).await.unwrap_err();
        assert_eq!(err, SubmitError::CaptchaRequired);
        assert_eq!(form.captcha_error(), Some(MSG_CAPTCHA_REQUIRED));
        assert!(!form.is_submitting());
        assert!(api.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn report_text_and_captcha_errors_together() {
        let api = FakeApi::default();
        let mut form = CommentForm::new(None);
        let err = form.submit(&api).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert_eq!(form.combined_errors(), vec!["Comment text is required."]);
        assert_eq!(form.captcha_error(), Some(MSG_CAPTCHA_REQUIRED));
        assert!(api.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn clear_everything_on_success() {
        let api = FakeApi::default();
        let mut form = verified_form("<b>Hello</b>");
        form.attach(AttachedFile::new("a.gif", "image/gif", vec![1, 2]))
            .unwrap();
        form.toggle_preview();

        let created = form.submit(&api).await.unwrap();
        assert_eq!(created.comment_id, 1);

        assert_eq!(form.text(), "");
        assert!(form.file().is_none());
        assert!(!form.captcha().is_verified());
        assert_eq!(form.captcha(), &CaptchaState::Rendered);
        assert_eq!(form.draft().captcha_token, None);
        assert!(!form.show_preview());
        assert!(!form.is_submitting());

        let sent = &api.sent.borrow()[0];
        assert_eq!(sent.text, "<b>Hello</b>");
        assert_eq!(sent.captcha, "tok");
        assert!(sent.attachment.is_some());
    }

    #[tokio::test]
    async fn keep_reply_target_after_success() {
        let api = FakeApi::default();
        let mut form = CommentForm::new(Some(5));
        form.handle_captcha(CaptchaEvent::Rendered);
        form.handle_captcha(CaptchaEvent::Verified("t".into()));
        form.set_text("reply");
        form.submit(&api).await.unwrap();
        assert_eq!(api.sent.borrow()[0].parent_comment, Some(5));
        assert!(form.is_reply());
    }

    #[tokio::test]
    async fn map_server_validation_errors_to_fields() {
        let api = FakeApi::default();
        *api.create_result.borrow_mut() = Some(Err(ApiError::Validation(FieldErrors::from([(
            "captcha".to_string(),
            "Invalid CAPTCHA.".to_string(),
        )]))));
        let mut form = verified_form("hello");
        let err = form.submit(&api).await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(ApiError::Validation(_))));
        assert_eq!(form.validation().error("captcha"), Some("Invalid CAPTCHA."));
        assert_eq!(form.general_error(), None);
        assert_eq!(form.captcha(), &CaptchaState::Rendered);
        assert_eq!(form.draft().captcha_token, None);
        assert!(!form.is_submitting());
        // the draft survives a failed attempt
        assert_eq!(form.text(), "hello");
    }

    #[tokio::test]
    async fn map_other_failures_to_general_errors() {
        let cases = [
            (
                ApiError::Server {
                    status: 502,
                    detail: None,
                },
                "Server error (502). Please try again.",
            ),
            (
                ApiError::Network("refused".into()),
                "No response from server. Please check your connection and try again.",
            ),
            (
                ApiError::Request("bad url".into()),
                "Could not send request: bad url",
            ),
        ];
        for (err, msg) in cases {
            let answered = matches!(err, ApiError::Server { .. });
            let api = FakeApi::default();
            *api.create_result.borrow_mut() = Some(Err(err));
            let mut form = verified_form("hello");
            assert!(form.submit(&api).await.is_err());
            assert_eq!(form.general_error(), Some(msg));
            assert!(!form.is_submitting());
            assert_eq!(form.captcha().is_verified(), !answered);
        }
    }

    #[test]
    fn split_submission_phases() {
        let mut form = verified_form("hi");
        let comment = form.begin_submit().unwrap();
        assert_eq!(comment.text, "hi");
        assert!(form.is_submitting());
        let result = form.finish_submit(Err(ApiError::Network("x".into())));
        assert!(result.is_err());
        assert!(!form.is_submitting());
    }
}
