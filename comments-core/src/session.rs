//! Authentication state shared by all views of the application.

use std::{cell::RefCell, rc::Rc};

use thiserror::Error;

use comments_boundary::{Credentials, NewUser, User, UserCreated};

use crate::api::{CommentsApi, Result};

pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Token storage failed: {0}")]
pub struct StoreError(pub String);

/// Persistent home of the bearer token.
pub trait TokenStore {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> std::result::Result<(), StoreError>;
    fn delete(&self) -> std::result::Result<(), StoreError>;
}

/// Bearer token and current user.
///
/// The token itself lives in the [`crate::api::BearerAuth`] of the adapter,
/// so every request sent through it carries the current token.
pub struct Session<A, S> {
    api: Rc<A>,
    store: Rc<S>,
    user: Rc<RefCell<Option<User>>>,
}

impl<A, S> Clone for Session<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            store: Rc::clone(&self.store),
            user: Rc::clone(&self.user),
        }
    }
}

impl<A, S> Session<A, S>
where
    A: CommentsApi,
    S: TokenStore,
{
    /// Creates a session and installs a previously persisted token.
    pub fn restore(api: A, store: S) -> Self {
        if let Some(token) = store.load().filter(|t| !t.is_empty()) {
            log::debug!("Restore persisted token");
            api.auth().install(&token);
        }
        Self {
            api: Rc::new(api),
            store: Rc::new(store),
            user: Rc::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn token(&self) -> Option<String> {
        self.api.auth().token()
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        let access = self.api.login(credentials).await?;
        log::info!("Logged in as {}", credentials.username);
        self.set_token(&access.access);
        self.fetch_user().await
    }

    /// Creates an account. The session itself is not changed.
    pub async fn register(&self, new_user: &NewUser) -> Result<UserCreated> {
        let created = self.api.register(new_user).await?;
        log::info!("Registered user {}", created.user_id);
        Ok(created)
    }

    /// Loads the current user, logging out if that fails.
    pub async fn fetch_user(&self) -> Result<Option<User>> {
        if self.token().is_none() {
            return Ok(None);
        }
        match self.api.current_user().await {
            Ok(user) => {
                *self.user.borrow_mut() = Some(user.clone());
                Ok(Some(user))
            }
            Err(err) => {
                log::warn!("Unable to fetch current user: {err}");
                self.logout();
                Err(err)
            }
        }
    }

    pub fn logout(&self) {
        log::debug!("Logout");
        self.user.borrow_mut().take();
        self.api.auth().remove();
        if let Err(err) = self.store.delete() {
            log::warn!("{err}");
        }
    }

    fn set_token(&self, token: &str) {
        if let Err(err) = self.store.save(token) {
            log::warn!("{err}");
        }
        self.api.auth().install(token);
    }
}
