use leptos::{ev, *};

use comments_boundary::{CommentCreated, CommentQuery, SortField};
use comments_core::{api::CommentsApi, thread::build_threads};

use crate::{components::*, Auth};

#[component]
pub fn Comments() -> impl IntoView {
    let auth = expect_context::<Auth>();
    let query = RwSignal::new(CommentQuery::default());

    let comments = create_local_resource(
        move || query.get(),
        move |query| {
            let api = auth.api();
            async move { api.comments(&query).await }
        },
    );

    let on_created = Callback::new(move |created: CommentCreated| {
        log::debug!("Reload comments after creating {}", created.comment_id);
        comments.refetch();
    });

    let set_sort_field = move |ev: ev::Event| {
        let value = event_target_value(&ev);
        match value.parse::<SortField>() {
            Ok(field) => query.update(|q| {
                q.sort.field = field;
                q.page = 1;
            }),
            Err(err) => log::warn!("{err}"),
        }
    };

    view! {
      <section class="comments">
        <CommentForm on_created />
        <div class="sort">
          <select on:change=set_sort_field>
            {SortField::ALL.into_iter().map(|field| view! {
              <option
                value=field.as_str()
                selected=move || query.with(|q| q.sort.field == field)
              >
                { field.as_str() }
              </option>
            }).collect_view()}
          </select>
          <button on:click=move |_| query.update(|q| q.sort.direction = q.sort.direction.toggled())>
            { move || query.with(|q| q.sort.direction.as_str()) }
          </button>
        </div>
        <Transition fallback=move || view! { <p>"Loading..."</p> }>
          {move || comments.get().map(|result| match result {
            Ok(list) => {
              let has_next = list.has_next_page(query.with_untracked(|q| q.per_page));
              let total = list.total();
              let threads = build_threads(list.into_comments());
              view! {
                {total.map(|total| view! { <p class="total">{ format!("{total} comments") }</p> })}
                <CommentList threads on_created />
                <Pagination query has_next />
              }.into_view()
            }
            Err(err) => view! { <p class="error">{ err.user_message() }</p> }.into_view(),
          })}
        </Transition>
      </section>
    }
}

#[component]
fn Pagination(query: RwSignal<CommentQuery>, has_next: bool) -> impl IntoView {
    let page = move || query.with(|q| q.page);
    view! {
      <nav class="pagination">
        <button
          prop:disabled = move || page() <= 1
          on:click = move |_| query.update(|q| q.page = q.page.saturating_sub(1).max(1))
        >
          "Previous"
        </button>
        <span>{ move || format!("Page {}", page()) }</span>
        <button
          prop:disabled = !has_next
          on:click = move |_| query.update(|q| q.page += 1)
        >
          "Next"
        </button>
      </nav>
    }
}
