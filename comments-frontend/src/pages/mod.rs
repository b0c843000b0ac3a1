mod comments;
mod login;
mod register;

#[derive(Debug, Clone, Copy, Default)]
pub enum Page {
    #[default]
    Comments,
    Login,
    Register,
}

impl Page {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Comments => "/",
            Self::Login => "/login",
            Self::Register => "/register",
        }
    }
}

pub use self::{comments::*, login::*, register::*};
