use leptos::{ev, *};
use leptos_router::*;

use comments_boundary::{NewUser, UserCreated};
use comments_core::api::{ApiError, FieldErrors};

use crate::{Auth, Page};

const FIELDS: [(&str, &str, &str); 5] = [
    ("username", "text", "Username"),
    ("email", "email", "Email address"),
    ("password", "password", "Password"),
    ("password_repeat", "password", "Repeat password"),
    ("homepage_url", "url", "Homepage (optional)"),
];

#[component]
pub fn Register() -> impl IntoView {
    let auth = expect_context::<Auth>();

    let new_user = RwSignal::new(NewUser::default());
    let (register_response, set_register_response) = create_signal(None::<UserCreated>);
    let (field_errors, set_field_errors) = create_signal(FieldErrors::new());
    let (register_error, set_register_error) = create_signal(None::<String>);
    let (wait_for_response, set_wait_for_response) = create_signal(false);

    let register_action = create_action(move |new_user: &NewUser| {
        log::info!("Try to register new account for {}", new_user.username);
        let new_user = new_user.clone();
        async move {
            set_wait_for_response.set(true);
            let result = auth.register(new_user.clone()).await;
            set_wait_for_response.set(false);
            set_field_errors.set(FieldErrors::new());
            set_register_error.set(None);
            match result {
                Ok(res) => set_register_response.set(Some(res)),
                Err(ApiError::Validation(errors)) if !errors.is_empty() => {
                    log::warn!("Invalid registration of {}", new_user.username);
                    set_field_errors.set(errors);
                }
                Err(err) => {
                    log::warn!("Unable to register {}: {err}", new_user.username);
                    set_register_error.set(Some(err.user_message()));
                }
            }
        }
    });

    let set_field = move |name: &str, value: String| {
        new_user.update(|u| match name {
            "username" => u.username = value,
            "email" => u.email = value,
            "password" => u.password = value,
            "password_repeat" => u.password_repeat = value,
            _ => u.homepage_url = Some(value).filter(|v| !v.trim().is_empty()),
        });
    };

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        register_action.dispatch(new_user.get_untracked());
    };

    view! {
      <section class="auth">
        {move || match register_response.get() {
          Some(res) => view! {
            <h4>"Successfully registered"</h4>
            <p>{ res.message }</p>
            <A href=Page::Login.path()>"Log in now"</A>
          }.into_view(),
          None => view! {
            <form on:submit=submit>
              <h4>"Register"</h4>
              {move || register_error.get().map(|err| view! { <p class="error">{ err }</p> })}
              {FIELDS.into_iter().map(|(name, input_type, placeholder)| view! {
                <input
                  type = input_type
                  placeholder = placeholder
                  required = name != "homepage_url"
                  prop:disabled = move || wait_for_response.get()
                  on:input = move |ev| set_field(name, event_target_value(&ev))
                />
                {move || field_errors.with(|errors| errors.get(name).cloned())
                    .map(|err| view! { <p class="error">{ err }</p> })}
              }).collect_view()}
              <button type="submit" prop:disabled = move || wait_for_response.get()>
                "Register"
              </button>
            </form>
            <p>
              "You already have an account? "
              <A href=Page::Login.path()>"Login"</A>
            </p>
          }.into_view(),
        }}
      </section>
    }
}
