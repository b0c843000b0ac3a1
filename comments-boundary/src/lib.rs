use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};

pub type CommentId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<CommentId>,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// Paginated envelope as produced by page-number pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Comment>,
}

/// Response of `GET /api/comments/`.
///
/// Depending on the backend configuration the list is either wrapped
/// into a [`CommentPage`] or delivered as a bare array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentList {
    Paginated(CommentPage),
    Plain(Vec<Comment>),
}

impl CommentList {
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        match self {
            Self::Paginated(page) => &page.results,
            Self::Plain(comments) => comments,
        }
    }

    #[must_use]
    pub fn into_comments(self) -> Vec<Comment> {
        match self {
            Self::Paginated(page) => page.results,
            Self::Plain(comments) => comments,
        }
    }

    /// Total number of comments on the server, if known.
    #[must_use]
    pub const fn total(&self) -> Option<u64> {
        match self {
            Self::Paginated(page) => Some(page.count),
            Self::Plain(_) => None,
        }
    }

    /// Whether another page may follow the one requested with `per_page`.
    #[must_use]
    pub fn has_next_page(&self, per_page: u32) -> bool {
        match self {
            Self::Paginated(page) => page.next.is_some(),
            Self::Plain(comments) => {
                u32::try_from(comments.len()).is_ok_and(|len| len >= per_page && per_page > 0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Username,
    Email,
}

impl SortField {
    pub const ALL: [Self; 3] = [Self::CreatedAt, Self::Username, Self::Email];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("Invalid sort field: {s}"))
    }
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("Invalid sort direction: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

pub const DEFAULT_PER_PAGE: u32 = 25;

/// Query parameters of `GET /api/comments/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub sort: Sort,
}

impl Default for CommentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort: Sort::default(),
        }
    }
}

impl CommentQuery {
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        let Self {
            page,
            per_page,
            sort: Sort { field, direction },
        } = self;
        [
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("sort_by", field.as_str().to_string()),
            ("sort_dir", direction.as_str().to_string()),
        ]
    }
}

/// File part of a multipart comment submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Multipart body of `POST /api/comments/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub parent_comment: Option<CommentId>,
    pub attachment: Option<NewAttachment>,
    pub captcha: String,
}

impl NewComment {
    /// Non-file parts of the multipart body, in submission order.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("text", self.text.clone())];
        if let Some(parent) = self.parent_comment {
            fields.push(("parent_comment", parent.to_string()));
        }
        fields.push(("captcha", self.captcha.clone()));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCreated {
    #[serde(default)]
    pub message: String,
    pub comment_id: CommentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[rustfmt::skip]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username        : String,
    pub email           : String,
    pub password        : String,
    pub password_repeat : String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url    : Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    #[serde(default)]
    pub message: String,
    pub user_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
}

/// Error messages reported for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessages {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessages {
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::One(msg) => msg.clone(),
            Self::Many(msgs) => msgs.join(" "),
        }
    }
}

/// Error body returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: BTreeMap<String, ErrorMessages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
