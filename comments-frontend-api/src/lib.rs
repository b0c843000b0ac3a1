//! Browser client of the comments API.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, FormData};

use comments_boundary::{
    AccessToken, CommentCreated, CommentList, CommentQuery, Credentials, NewAttachment,
    NewComment, NewUser, User, UserCreated,
};
use comments_core::api::{
    endpoint, ApiError, BearerAuth, CommentsApi, Result, COMMENTS_PATH, LOGIN_PATH, USER_PATH,
};

const ATTACHMENT_FIELD: &str = "attachment";

/// Comments API
#[derive(Clone)]
pub struct Api {
    url: String,
    auth: BearerAuth,
}

impl Api {
    #[must_use]
    pub fn new(url: impl Into<String>, auth: BearerAuth) -> Self {
        Self {
            url: url.into(),
            auth,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint(&self.url, path)
    }

    // Applied to every outgoing request.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.auth.header_value() {
            Some(value) => req.header("Authorization", &value),
            None => req,
        }
    }

    async fn send<T>(&self, req: Request) -> Result<T>
    where
        T: DeserializeOwned,
    {
        log::debug!("Send request to {}", req.url());
        let response = req.send().await.map_err(classify)?;
        into_json(response).await
    }
}

#[async_trait(?Send)]
impl CommentsApi for Api {
    fn auth(&self) -> &BearerAuth {
        &self.auth
    }

    async fn comments(&self, query: &CommentQuery) -> Result<CommentList> {
        let url = self.endpoint(COMMENTS_PATH);
        let request = self
            .authorize(Request::get(&url).query(query.query_pairs()))
            .build()
            .map_err(classify)?;
        self.send(request).await
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<CommentCreated> {
        let url = self.endpoint(COMMENTS_PATH);
        let body = form_data(comment)
            .map_err(|err| ApiError::Request(format!("Invalid form data: {err:?}")))?;
        let request = self
            .authorize(Request::post(&url))
            .body(body)
            .map_err(classify)?;
        self.send(request).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AccessToken> {
        let url = self.endpoint(LOGIN_PATH);
        let request = self
            .authorize(Request::post(&url))
            .json(credentials)
            .map_err(classify)?;
        self.send(request).await
    }

    async fn register(&self, user: &NewUser) -> Result<UserCreated> {
        let url = self.endpoint(USER_PATH);
        let request = self
            .authorize(Request::post(&url))
            .json(user)
            .map_err(classify)?;
        self.send(request).await
    }

    async fn current_user(&self) -> Result<User> {
        let url = self.endpoint(USER_PATH);
        let request = self
            .authorize(Request::get(&url))
            .build()
            .map_err(classify)?;
        self.send(request).await
    }
}

/// A rejected `fetch` means that no response was received.
fn classify(err: gloo_net::Error) -> ApiError {
    match err {
        gloo_net::Error::JsError(err) => ApiError::Network(err.to_string()),
        err => ApiError::Request(err.to_string()),
    }
}

async fn into_json<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    // ensure we've got 2xx status
    if response.ok() {
        return response.json().await.map_err(|err| ApiError::Server {
            status,
            detail: Some(format!("Unexpected response: {err}")),
        });
    }
    let body = response.text().await.unwrap_or_default();
    let err = ApiError::from_response(status, &body);
    log::warn!("{err}");
    Err(err)
}

fn form_data(comment: &NewComment) -> std::result::Result<FormData, JsValue> {
    let form = FormData::new()?;
    for (name, value) in comment.text_fields() {
        form.append_with_str(name, &value)?;
    }
    if let Some(NewAttachment {
        file_name,
        mime,
        bytes,
    }) = &comment.attachment
    {
        let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
        let options = BlobPropertyBag::new();
        options.set_type(mime);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
        form.append_with_blob_and_filename(ATTACHMENT_FIELD, &blob, file_name)?;
    }
    Ok(form)
}
