mod comment_form;
mod comment_list;
mod navbar;

pub use self::{comment_form::*, comment_list::*, navbar::*};
