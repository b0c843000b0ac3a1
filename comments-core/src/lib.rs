//! Client side logic of the comment system.
//!
//! Everything that talks to the outside world is behind a port:
//! [`api::CommentsApi`], [`session::TokenStore`] and [`captcha::CaptchaWidget`].

pub mod api;
pub mod captcha;
pub mod file;
pub mod form;
pub mod sanitize;
pub mod session;
pub mod submit;
pub mod thread;
pub mod validate;

pub use comments_boundary as boundary;
