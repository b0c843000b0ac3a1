use leptos::*;
use leptos_router::*;

use comments_boundary::User;

use crate::Page;

#[component]
pub fn NavBar<F>(user: Signal<Option<User>>, on_logout: F) -> impl IntoView
where
    F: Fn() + 'static + Copy,
{
    let (menu_open, set_menu_open) = create_signal(false);

    view! {
      <nav class="navbar">
        <div class="brand">
          <A href = Page::Comments.path()>"Comments"</A>
        </div>
        <button
          class = move || if menu_open.get() { "hamburger open" } else { "hamburger" }
          on:click = move |_| set_menu_open.update(|s| *s = !*s)
        >
          <span></span>
        </button>
        <menu class = move || if menu_open.get() { "menu open" } else { "menu" }>
          <UserMenu user on_logout />
        </menu>
      </nav>
    }
}

#[component]
fn UserMenu<F>(user: Signal<Option<User>>, on_logout: F) -> impl IntoView
where
    F: Fn() + 'static + Copy,
{
    let memorized_user = create_memo(move |_| user.get());

    move || match memorized_user.get() {
        Some(user) => view! { <UserMenuItems user on_logout /> }.into_view(),
        None => view! { <PublicMenuItems /> }.into_view(),
    }
}

#[component]
fn UserMenuItems<F>(user: User, on_logout: F) -> impl IntoView
where
    F: Fn() + 'static + Clone,
{
    view! {
      <MenuItem page = Page::Comments label = "Comments" />
      <a href="#" on:click = move |ev| { ev.prevent_default(); on_logout(); }>
        { format!("Logout ({})", user.username) }
      </a>
    }
}

#[component]
fn PublicMenuItems() -> impl IntoView {
    view! {
      <MenuItem page = Page::Comments label = "Comments" />
      <MenuItem page = Page::Login label = "Login" />
      <MenuItem page = Page::Register label = "Register" />
    }
}

#[component]
fn MenuItem(page: Page, label: &'static str) -> impl IntoView {
    view! {
      <A href=page.path()>{ label }</A>
    }
}
