use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use async_trait::async_trait;
use thiserror::Error;

use comments_boundary::{
    AccessToken, CommentCreated, CommentList, CommentQuery, Credentials, ErrorMessages,
    ErrorResponse, NewComment, NewUser, User, UserCreated,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const COMMENTS_PATH: &str = "/api/comments/";
pub const LOGIN_PATH: &str = "/api/login/";
pub const USER_PATH: &str = "/api/user/";

/// Error message per field name.
pub type FieldErrors = BTreeMap<String, String>;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure of a backend request, classified where the request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server rejected the payload (HTTP 400).
    #[error("The server rejected the request: {0:?}")]
    Validation(FieldErrors),
    /// Any other non-success status.
    #[error("Server error ({status})")]
    Server { status: u16, detail: Option<String> },
    /// The request was sent but no response arrived.
    #[error("No response from server: {0}")]
    Network(String),
    /// The request could not be constructed or sent.
    #[error("Could not send request: {0}")]
    Request(String),
}

impl ApiError {
    /// Message to show when no field-specific error is available.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) if errors.is_empty() => {
                "The server rejected the request.".to_string()
            }
            Self::Validation(errors) => errors
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
            Self::Server {
                status,
                detail: Some(detail),
            } => format!("Server error ({status}): {detail}"),
            Self::Server { status, .. } => format!("Server error ({status}). Please try again."),
            Self::Network(_) => {
                "No response from server. Please check your connection and try again.".to_string()
            }
            Self::Request(msg) => format!("Could not send request: {msg}"),
        }
    }

    /// Classifies a non-success response by status and body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 400 {
            return Self::Validation(parse_field_errors(body));
        }
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|res| res.detail);
        Self::Server { status, detail }
    }
}

/// Extracts field errors from either `{"errors": {..}}` or a bare field map.
#[must_use]
pub fn parse_field_errors(body: &str) -> FieldErrors {
    let flatten = |errors: BTreeMap<String, ErrorMessages>| -> FieldErrors {
        errors
            .into_iter()
            .map(|(field, msgs)| (field, msgs.joined()))
            .collect()
    };
    if let Ok(ErrorResponse { errors, detail }) = serde_json::from_str::<ErrorResponse>(body) {
        if !errors.is_empty() {
            return flatten(errors);
        }
        if let Some(detail) = detail {
            return FieldErrors::from([("detail".to_string(), detail)]);
        }
    }
    if let Ok(errors) = serde_json::from_str::<BTreeMap<String, ErrorMessages>>(body) {
        return flatten(errors);
    }
    log::warn!("Unable to parse validation errors from response body");
    FieldErrors::new()
}

/// Default `Authorization` header shared by a session and the clients it authorizes.
#[derive(Debug, Clone, Default)]
pub struct BearerAuth(Rc<RefCell<Option<String>>>);

impl BearerAuth {
    pub fn install(&self, token: &str) {
        *self.0.borrow_mut() = Some(token.to_string());
    }

    pub fn remove(&self) {
        self.0.borrow_mut().take();
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        self.0.borrow().as_ref().map(|t| format!("Bearer {t}"))
    }
}

/// Backend of the comment system.
///
/// Implementations must attach [`CommentsApi::auth`] to every outgoing
/// request and report failures as [`ApiError`].
#[async_trait(?Send)]
pub trait CommentsApi {
    fn auth(&self) -> &BearerAuth;
    async fn comments(&self, query: &CommentQuery) -> Result<CommentList>;
    async fn create_comment(&self, comment: &NewComment) -> Result<CommentCreated>;
    async fn login(&self, credentials: &Credentials) -> Result<AccessToken>;
    async fn register(&self, user: &NewUser) -> Result<UserCreated>;
    async fn current_user(&self) -> Result<User>;
}

#[must_use]
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}
