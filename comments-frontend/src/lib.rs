use leptos::*;
use leptos_router::*;

use comments_boundary::{Credentials, NewUser, User, UserCreated};
use comments_core::{
    api::{ApiError, BearerAuth, DEFAULT_API_URL},
    session::Session,
};
use comments_frontend_api::Api;

mod captcha;
mod file;
mod storage;

mod pages;
use pages::*;

mod components;
use components::*;

use self::{captcha::ProviderLoaded, storage::LocalTokenStore};

const API_BASE_URL: &str = match option_env!("API_BASE_URL") {
    Some(url) => url,
    None => DEFAULT_API_URL,
};

pub type AppSession = Session<Api, LocalTokenStore>;

/// Session handle shared with all components.
#[derive(Clone, Copy)]
pub struct Auth {
    session: StoredValue<AppSession>,
    user: RwSignal<Option<User>>,
}

impl Auth {
    fn new(session: AppSession) -> Self {
        Self {
            session: store_value(session),
            user: RwSignal::new(None),
        }
    }

    #[must_use]
    pub fn api(&self) -> Api {
        self.session.with_value(|s| s.api().clone())
    }

    #[must_use]
    pub fn user(&self) -> Signal<Option<User>> {
        self.user.into()
    }

    pub async fn fetch_user(self) {
        let session = self.session.get_value();
        if let Err(err) = session.fetch_user().await {
            log::error!("Unable to fetch user info: {err}");
        }
        self.user.set(session.user());
    }

    pub async fn login(self, credentials: Credentials) -> Result<(), ApiError> {
        let session = self.session.get_value();
        let result = session.login(&credentials).await;
        self.user.set(session.user());
        result.map(|_| ())
    }

    pub async fn register(self, new_user: NewUser) -> Result<UserCreated, ApiError> {
        self.session.get_value().register(&new_user).await
    }

    pub fn logout(self) {
        self.session.with_value(AppSession::logout);
        self.user.set(None);
    }
}

#[component]
#[must_use]
pub fn App() -> impl IntoView {
    // -- init API -- //

    let api = Api::new(API_BASE_URL, BearerAuth::default());
    let auth = Auth::new(Session::restore(api, LocalTokenStore));
    provide_context(auth);
    provide_context(ProviderLoaded(RwSignal::new(false)));

    // -- actions -- //

    let fetch_user_info = Action::new(move |()| auth.fetch_user());

    // -- callbacks -- //

    let on_logout = move || {
        log::info!("Logout");
        auth.logout();
    };

    if auth.session.with_value(AppSession::is_authenticated) {
        fetch_user_info.dispatch(());
    }

    view! {
      <Router>
        <NavBar user = auth.user() on_logout />
        <main>
          <Routes>
            <Route
              path=Page::Comments.path()
              view=move || view! { <Comments /> }
            />
            <Route
              path=Page::Login.path()
              view=move || view! {
                <Login
                  on_success = move || {
                      log::info!("Successfully logged in");
                      let navigate = use_navigate();
                      navigate(Page::Comments.path(), NavigateOptions::default());
                  } />
              }
            />
            <Route
              path=Page::Register.path()
              view=move || view! { <Register /> }
            />
          </Routes>
        </main>
      </Router>
    }
}

pub fn run() {
    mount_to_body(|| view! { <App /> });
}
