use leptos::{ev, *};
use leptos_router::*;

use comments_boundary::Credentials;

use crate::{Auth, Page};

#[component]
pub fn Login<F>(on_success: F) -> impl IntoView
where
    F: Fn() + 'static + Clone,
{
    let auth = expect_context::<Auth>();

    let (username, set_username) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (login_error, set_login_error) = create_signal(None::<String>);
    let (wait_for_response, set_wait_for_response) = create_signal(false);

    let login_action = create_action(move |credentials: &Credentials| {
        log::info!("Logging in as {}", credentials.username);
        let credentials = credentials.to_owned();
        let on_success = on_success.clone();
        async move {
            set_wait_for_response.set(true);
            let result = auth.login(credentials).await;
            set_wait_for_response.set(false);
            match result {
                Ok(()) => {
                    set_login_error.set(None);
                    on_success();
                }
                Err(err) => {
                    log::warn!("Unable to login: {err}");
                    set_login_error.set(Some(err.user_message()));
                }
            }
        }
    });

    let credentials = Signal::derive(move || {
        let username = username.get();
        let password = password.get();
        if username.trim().is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials {
            username: username.trim().to_owned(),
            password,
        })
    });

    let disabled = Signal::derive(move || wait_for_response.get() || credentials.get().is_none());

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if let Some(credentials) = credentials.get_untracked() {
            login_action.dispatch(credentials);
        }
    };

    view! {
      <section class="auth">
        <form on:submit=submit>
          <h4>"Login"</h4>
          {move || login_error.get().map(|err| view! { <p class="error">{ err }</p> })}
          <input
            type = "text"
            required
            placeholder = "Username"
            prop:disabled = move || wait_for_response.get()
            on:input = move |ev| set_username.set(event_target_value(&ev))
          />
          <input
            type = "password"
            required
            placeholder = "Password"
            prop:disabled = move || wait_for_response.get()
            on:input = move |ev| set_password.set(event_target_value(&ev))
          />
          <button type="submit" prop:disabled = move || disabled.get()>
            { move || if wait_for_response.get() { "Logging in..." } else { "Log in" } }
          </button>
        </form>
        <p>
          "Don't have an account? "
          <A href=Page::Register.path()>"Register"</A>
        </p>
      </section>
    }
}
