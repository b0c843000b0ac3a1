use leptos::{ev, *};
use web_sys::HtmlInputElement;

use comments_boundary::{CommentCreated, CommentId};
use comments_core::{
    api::CommentsApi,
    captcha::CaptchaEvent,
    file::{format_file_size, validate_file, FileKind},
    form::CommentForm as FormState,
    validate::FIELD_TEXT,
};

use crate::{
    captcha::Recaptcha,
    file::{read_attachment, PickedFile},
    Auth,
};

#[component]
pub fn CommentForm(
    /// The comment to reply to.
    #[prop(optional)]
    parent: Option<CommentId>,
    #[prop(into)] on_created: Callback<CommentCreated>,
) -> impl IntoView {
    let auth = expect_context::<Auth>();
    let form = RwSignal::new(FormState::new(parent));
    let reset_captcha = RwSignal::new(0_usize);

    // -- actions -- //

    let submit_action = create_action(move |()| {
        let api = auth.api();
        async move {
            let Some(Ok(comment)) = form.try_update(FormState::begin_submit) else {
                return;
            };
            let result = api.create_comment(&comment).await;
            match form.try_update(|f| f.finish_submit(result)) {
                Some(Ok(created)) => {
                    reset_captcha.update(|n| *n += 1);
                    on_created.call(created);
                }
                // a consumed token needs a fresh challenge
                Some(Err(_)) if form.with_untracked(|f| !f.captcha().is_verified()) => {
                    reset_captcha.update(|n| *n += 1);
                }
                _ => {}
            }
        }
    });

    // -- callbacks -- //

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if form.with_untracked(FormState::is_submitting) {
            return;
        }
        submit_action.dispatch(());
    };

    let on_file = move |ev: ev::Event| {
        let input = event_target::<HtmlInputElement>(&ev);
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        input.set_value("");
        let constraints = form.with_untracked(|f| f.constraints().clone());
        if let Err(err) = validate_file(&PickedFile::from(&file), &constraints) {
            form.update(|f| f.reject_file(err.to_string()));
            return;
        }
        spawn_local(async move {
            match read_attachment(&file).await {
                Ok(attached) => form.update(|f| {
                    _ = f.attach(attached);
                }),
                Err(err) => form.update(|f| f.reject_file(err)),
            }
        });
    };

    let submitting = move || form.with(FormState::is_submitting);
    let captcha_container = parent.map_or_else(
        || "recaptcha-comment".to_string(),
        |id| format!("recaptcha-reply-{id}"),
    );

    view! {
      <form class="comment-form" on:submit=on_submit>
        <textarea
          rows = 4
          placeholder = move || if form.with(FormState::is_reply) { "Write a reply..." } else { "Write a comment..." }
          prop:value = move || form.with(|f| f.text().to_string())
          prop:disabled = submitting
          on:input = move |ev| {
            let text = event_target_value(&ev);
            form.update(|f| f.set_text(text));
          }
        />
        {move || form.with(FormState::combined_errors)
            .into_iter()
            .map(|err| view! { <p class="error">{ err }</p> })
            .collect_view()}
        {move || form.with(|f| {
            f.validation()
                .errors
                .iter()
                .filter(|(field, _)| field.as_str() != FIELD_TEXT)
                .map(|(_, err)| view! { <p class="error">{ err.clone() }</p> })
                .collect_view()
        })}

        <div class="toolbar">
          <button type="button" on:click = move |_| form.update(FormState::toggle_preview)>
            { move || if form.with(FormState::show_preview) { "Hide preview" } else { "Preview" } }
          </button>
          <input type="file" accept="image/jpeg,image/png,image/gif,text/plain" on:change=on_file />
        </div>
        {move || form.with(|f| f.file_error().map(|err| view! { <p class="error">{ err.to_string() }</p> }))}
        <AttachmentPreview form />

        <Show when = move || form.with(FormState::show_preview)>
          <div class="preview" inner_html = move || form.with(FormState::preview_html)></div>
        </Show>

        <Recaptcha
          container_id = captcha_container
          on_event = move |event: CaptchaEvent| form.update(|f| f.handle_captcha(event))
          reset = reset_captcha
        />
        {move || form.with(|f| f.captcha_error().map(|err| view! { <p class="error">{ err.to_string() }</p> }))}
        {move || form.with(|f| f.general_error().map(|err| view! { <p class="error">{ err.to_string() }</p> }))}

        <button type="submit" prop:disabled = submitting>
          { move || if submitting() { "Sending..." } else { "Send" } }
        </button>
      </form>
    }
}

#[component]
fn AttachmentPreview(form: RwSignal<FormState>) -> impl IntoView {
    move || {
        form.with(|f| {
            f.file().map(|file| {
                let name = file.name.clone();
                #[allow(clippy::cast_possible_wrap)]
                let size = format_file_size(file.size() as i64);
                let image = (file.kind == FileKind::Image)
                    .then(|| file.preview().map(ToString::to_string))
                    .flatten();
                view! {
                  <div class="attachment">
                    {image.map(|src| view! { <img src=src alt=name.clone() /> })}
                    <span>{ format!("{name} ({size})") }</span>
                    <button type="button" on:click = move |_| form.update(FormState::remove_file)>
                      "Remove"
                    </button>
                  </div>
                }
            })
        })
    }
}
