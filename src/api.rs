//! Native client of the comments API.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;

use comments_boundary::{
    AccessToken, CommentCreated, CommentList, CommentQuery, Credentials, NewAttachment,
    NewComment, NewUser, User, UserCreated,
};
use comments_core::api::{
    endpoint, ApiError, BearerAuth, CommentsApi, Result, COMMENTS_PATH, LOGIN_PATH, USER_PATH,
};

const ATTACHMENT_FIELD: &str = "attachment";

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    url: String,
    auth: BearerAuth,
}

impl HttpApi {
    pub fn new(url: impl Into<String>, auth: BearerAuth) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            auth,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint(&self.url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.auth.header_value() {
            Some(value) => req.header(reqwest::header::AUTHORIZATION, value),
            None => req,
        }
    }

    async fn send<T>(&self, req: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let req = self.authorize(req).build().map_err(classify)?;
        log::debug!("{} {}", req.method(), req.url());
        let response = self.client.execute(req).await.map_err(classify)?;
        into_json(response).await
    }
}

#[async_trait(?Send)]
impl CommentsApi for HttpApi {
    fn auth(&self) -> &BearerAuth {
        &self.auth
    }

    async fn comments(&self, query: &CommentQuery) -> Result<CommentList> {
        let req = self
            .client
            .get(self.endpoint(COMMENTS_PATH))
            .query(&query.query_pairs());
        self.send(req).await
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<CommentCreated> {
        let form = multipart_form(comment)?;
        let req = self
            .client
            .post(self.endpoint(COMMENTS_PATH))
            .multipart(form);
        self.send(req).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AccessToken> {
        let req = self.client.post(self.endpoint(LOGIN_PATH)).json(credentials);
        self.send(req).await
    }

    async fn register(&self, user: &NewUser) -> Result<UserCreated> {
        let req = self.client.post(self.endpoint(USER_PATH)).json(user);
        self.send(req).await
    }

    async fn current_user(&self) -> Result<User> {
        let req = self.client.get(self.endpoint(USER_PATH));
        self.send(req).await
    }
}

/// Anything that failed after the request left the client means no response.
fn classify(err: reqwest::Error) -> ApiError {
    if err.is_builder() || err.is_body() || err.is_redirect() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

async fn into_json<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status().as_u16();
    let success = response.status().is_success();
    let body = response
        .text()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;
    if success {
        return serde_json::from_str(&body).map_err(|err| ApiError::Server {
            status,
            detail: Some(format!("Unexpected response: {err}")),
        });
    }
    let err = ApiError::from_response(status, &body);
    log::warn!("{err}");
    Err(err)
}

fn multipart_form(comment: &NewComment) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in comment.text_fields() {
        form = form.text(name, value);
    }
    if let Some(NewAttachment {
        file_name,
        mime,
        bytes,
    }) = &comment.attachment
    {
        let part = Part::bytes(bytes.clone())
            .file_name(file_name.clone())
            .mime_str(mime)
            .map_err(|err| ApiError::Request(format!("Invalid attachment type: {err}")))?;
        form = form.part(ATTACHMENT_FIELD, part);
    }
    Ok(form)
}
