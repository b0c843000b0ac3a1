use leptos::*;

use comments_boundary::CommentCreated;
use comments_core::{sanitize::sanitize_html, thread::CommentThread};

use super::CommentForm;

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

#[component]
pub fn CommentList(
    threads: Vec<CommentThread>,
    #[prop(into)] on_created: Callback<CommentCreated>,
) -> View {
    if threads.is_empty() {
        return view! { <p class="empty">"No comments yet."</p> }.into_view();
    }
    view! {
      <ul class="comment-list">
        {threads
            .into_iter()
            .map(|thread| view! { <CommentItem thread on_created /> })
            .collect_view()}
      </ul>
    }
    .into_view()
}

#[component]
fn CommentItem(thread: CommentThread, on_created: Callback<CommentCreated>) -> View {
    let CommentThread { comment, replies } = thread;
    let id = comment.id;
    let replying = RwSignal::new(false);
    let author = comment
        .username
        .clone()
        .unwrap_or_else(|| "Anonymous".to_string());

    let on_reply_created = Callback::new(move |created: CommentCreated| {
        replying.set(false);
        on_created.call(created);
    });

    view! {
      <li class="comment">
        <div class="meta">
          <span class="author">{ author }</span>
          {comment.created_at.map(|at| view! { <span class="date">{ at }</span> })}
        </div>
        <div class="text" inner_html = sanitize_html(&comment.text)></div>
        {comment.attachment.map(|url| view! { <Attachment url /> })}
        <button
          class="reply"
          on:click = move |_| replying.update(|r| *r = !*r)
        >
          { move || if replying.get() { "Cancel" } else { "Reply" } }
        </button>
        <Show when = move || replying.get()>
          <CommentForm parent = id on_created = on_reply_created />
        </Show>
        {(!replies.is_empty()).then(|| view! {
          <CommentList threads = replies on_created />
        })}
      </li>
    }
    .into_view()
}

#[component]
fn Attachment(url: String) -> impl IntoView {
    let lower = url.to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        view! {
          <a href=url.clone() target="_blank" rel="noopener noreferrer">
            <img class="attachment" src=url alt="attachment" />
          </a>
        }
        .into_view()
    } else {
        view! {
          <a href=url target="_blank" rel="noopener noreferrer">"Attachment"</a>
        }
        .into_view()
    }
}
