//! CAPTCHA widget life cycle.
//!
//! The provider script and widget are abstracted by [`CaptchaWidget`] so that
//! the state machine can be driven without a browser.

pub const DEFAULT_SITE_KEY: &str = "6Le_w3krAAAAAPQrQavEf7O4Wfs9kUmJdYYAY7u3";
pub const DEFAULT_LOAD_CALLBACK: &str = "commentsRecaptchaOnLoad";
const SCRIPT_BASE_URL: &str = "https://www.google.com/recaptcha/api.js";

pub const MSG_VERIFICATION_FAILED: &str = "CAPTCHA verification failed";
pub const MSG_VERIFICATION_EXPIRED: &str = "CAPTCHA verification expired";
pub const MSG_INIT_FAILED: &str = "Failed to initialize CAPTCHA";

pub type WidgetId = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaConfig {
    pub site_key: String,
    /// Id of the DOM element the widget is rendered into.
    pub container_id: String,
    /// Name of the global function the provider calls once it is loaded.
    pub load_callback: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            site_key: DEFAULT_SITE_KEY.to_string(),
            container_id: "recaptcha-container".to_string(),
            load_callback: DEFAULT_LOAD_CALLBACK.to_string(),
        }
    }
}

impl CaptchaConfig {
    #[must_use]
    pub fn script_url(&self) -> String {
        format!(
            "{SCRIPT_BASE_URL}?onload={}&render=explicit",
            self.load_callback
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptchaState {
    #[default]
    Unloaded,
    Rendered,
    Verified {
        token: String,
    },
    Errored,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaEvent {
    Rendered,
    Verified(String),
    Failed,
    Expired,
    Reset,
}

impl CaptchaState {
    /// Transition function of the widget life cycle.
    #[must_use]
    pub fn apply(self, event: CaptchaEvent) -> Self {
        match (self, event) {
            (Self::Unloaded, CaptchaEvent::Rendered) => Self::Rendered,
            (Self::Unloaded, ev) => {
                log::debug!("Ignore CAPTCHA event {ev:?}: no widget rendered");
                Self::Unloaded
            }
            (_, CaptchaEvent::Verified(token)) => Self::Verified { token },
            (_, CaptchaEvent::Failed) => Self::Errored,
            (_, CaptchaEvent::Expired) => Self::Expired,
            (_, CaptchaEvent::Rendered | CaptchaEvent::Reset) => Self::Rendered,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Verified { token } => Some(token),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Errored => Some(MSG_VERIFICATION_FAILED),
            Self::Expired => Some(MSG_VERIFICATION_EXPIRED),
            _ => None,
        }
    }
}

/// Third-party challenge provider.
pub trait CaptchaWidget {
    /// Whether the provider script has been loaded.
    fn is_available(&self) -> bool;
    /// Injects the provider script and registers the global load callback.
    fn load_script(&self, config: &CaptchaConfig);
    fn render(&self, config: &CaptchaConfig) -> Result<WidgetId, String>;
    fn reset(&self, widget_id: WidgetId);
    fn remove_load_callback(&self, config: &CaptchaConfig);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered,
    Pending,
}

pub struct Captcha<W> {
    widget: W,
    config: CaptchaConfig,
    widget_id: Option<WidgetId>,
    script_requested: bool,
    state: CaptchaState,
    init_error: Option<&'static str>,
    // transitions caused by the controller itself, not by widget callbacks
    emitted: Vec<CaptchaEvent>,
}

impl<W> Captcha<W>
where
    W: CaptchaWidget,
{
    pub fn new(widget: W, config: CaptchaConfig) -> Self {
        Self {
            widget,
            config,
            widget_id: None,
            script_requested: false,
            state: CaptchaState::Unloaded,
            init_error: None,
            emitted: Vec::new(),
        }
    }

    pub fn load(&mut self) -> LoadOutcome {
        if self.widget.is_available() {
            self.render();
            return LoadOutcome::Rendered;
        }
        if !self.script_requested {
            log::debug!("Load CAPTCHA script");
            self.widget.load_script(&self.config);
            self.script_requested = true;
        }
        LoadOutcome::Pending
    }

    pub fn render(&mut self) {
        if self.widget_id.is_some() || !self.widget.is_available() {
            return;
        }
        match self.widget.render(&self.config) {
            Ok(id) => {
                log::debug!("Rendered CAPTCHA widget {id}");
                self.widget_id = Some(id);
                self.init_error = None;
                self.emit(CaptchaEvent::Rendered);
            }
            Err(err) => {
                log::error!("Unable to render CAPTCHA widget: {err}");
                self.init_error = Some(MSG_INIT_FAILED);
            }
        }
    }

    pub fn handle(&mut self, event: CaptchaEvent) {
        self.state = std::mem::take(&mut self.state).apply(event);
    }

    pub fn reset(&mut self) {
        if let Some(id) = self.widget_id {
            self.widget.reset(id);
        }
        self.emit(CaptchaEvent::Reset);
    }

    /// Events caused by [`Captcha::render`] and [`Captcha::reset`] since the last call.
    pub fn take_events(&mut self) -> Vec<CaptchaEvent> {
        std::mem::take(&mut self.emitted)
    }

    /// Removes the shared global load callback, unless the script is still loading.
    pub fn teardown(&mut self) {
        if self.widget.is_available() {
            self.widget.remove_load_callback(&self.config);
        } else {
            log::debug!("Keep CAPTCHA load callback until the provider is loaded");
        }
    }

    fn emit(&mut self, event: CaptchaEvent) {
        self.handle(event.clone());
        self.emitted.push(event);
    }

    pub const fn state(&self) -> &CaptchaState {
        &self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token()
    }

    pub const fn is_verified(&self) -> bool {
        self.state.is_verified()
    }

    pub const fn widget_id(&self) -> Option<WidgetId> {
        self.widget_id
    }

    /// User-facing error of the widget, if any.
    pub fn error(&self) -> Option<&'static str> {
        self.init_error.or_else(|| self.state.message())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Debug, Default)]
    pub struct Calls {
        pub available: bool,
        fail_render: bool,
        scripts: usize,
        renders: usize,
        resets: Vec<WidgetId>,
        callback_removed: bool,
    }

    #[derive(Clone, Default)]
    pub struct FakeWidget(pub Rc<RefCell<Calls>>);

    impl CaptchaWidget for FakeWidget {
        fn is_available(&self) -> bool {
            self.0.borrow().available
        }
        fn load_script(&self, _: &CaptchaConfig) {
            self.0.borrow_mut().scripts += 1;
        }
        fn render(&self, _: &CaptchaConfig) -> Result<WidgetId, String> {
            let mut calls = self.0.borrow_mut();
            if calls.fail_render {
                return Err("boom".to_string());
            }
            calls.renders += 1;
            Ok(7)
        }
        fn reset(&self, widget_id: WidgetId) {
            self.0.borrow_mut().resets.push(widget_id);
        }
        fn remove_load_callback(&self, _: &CaptchaConfig) {
            self.0.borrow_mut().callback_removed = true;
        }
    }

    pub fn captcha() -> (Captcha<FakeWidget>, FakeWidget) {
        let widget = FakeWidget::default();
        (Captcha::new(widget.clone(), CaptchaConfig::default()), widget)
    }

    #[test]
    fn script_url() {
        assert_eq!(
            CaptchaConfig::default().script_url(),
            "https://www.google.com/recaptcha/api.js?onload=commentsRecaptchaOnLoad&render=explicit"
        );
    }

    #[test]
    fn transitions() {
        let s = CaptchaState::Unloaded.apply(CaptchaEvent::Rendered);
        assert_eq!(s, CaptchaState::Rendered);
        let s = s.apply(CaptchaEvent::Verified("tok".into()));
        assert_eq!(s.token(), Some("tok"));
        let s = s.apply(CaptchaEvent::Expired);
        assert_eq!(s, CaptchaState::Expired);
        assert_eq!(s.token(), None);
        assert_eq!(s.message(), Some(MSG_VERIFICATION_EXPIRED));
        let s = s.apply(CaptchaEvent::Reset);
        assert_eq!(s, CaptchaState::Rendered);
        let s = s.apply(CaptchaEvent::Failed);
        assert_eq!(s.message(), Some(MSG_VERIFICATION_FAILED));
        assert!(!s.is_verified());
        assert_eq!(s.apply(CaptchaEvent::Reset), CaptchaState::Rendered);
    }

    #[test]
    fn ignore_events_before_rendering() {
        assert_eq!(
            CaptchaState::Unloaded.apply(CaptchaEvent::Verified("x".into())),
            CaptchaState::Unloaded
        );
        assert_eq!(
            CaptchaState::Unloaded.apply(CaptchaEvent::Reset),
            CaptchaState::Unloaded
        );
    }

    #[test]
    fn inject_script_only_once() {
        let (mut captcha, widget) = captcha();
        assert_eq!(captcha.load(), LoadOutcome::Pending);
        assert_eq!(captcha.load(), LoadOutcome::Pending);
        assert_eq!(widget.0.borrow().scripts, 1);
        assert_eq!(captcha.state(), &CaptchaState::Unloaded);

        // provider calls the load callback
        widget.0.borrow_mut().available = true;
        captcha.render();
        assert_eq!(captcha.state(), &CaptchaState::Rendered);
        assert_eq!(captcha.widget_id(), Some(7));
    }

    #[test]
    fn render_immediately_when_available() {
        let (mut captcha, widget) = captcha();
        widget.0.borrow_mut().available = true;
        assert_eq!(captcha.load(), LoadOutcome::Rendered);
        assert_eq!(widget.0.borrow().scripts, 0);
        assert_eq!(widget.0.borrow().renders, 1);
    }

    #[test]
    fn render_is_idempotent() {
        let (mut captcha, widget) = captcha();
        widget.0.borrow_mut().available = true;
        captcha.render();
        captcha.render();
        captcha.load();
        assert_eq!(widget.0.borrow().renders, 1);
    }

    #[test]
    fn report_render_failure() {
        let (mut captcha, widget) = captcha();
        {
            let mut calls = widget.0.borrow_mut();
            calls.available = true;
            calls.fail_render = true;
        }
        captcha.render();
        assert_eq!(captcha.widget_id(), None);
        assert_eq!(captcha.error(), Some(MSG_INIT_FAILED));
        assert_eq!(captcha.state(), &CaptchaState::Unloaded);
    }

    #[test]
    fn verify_expire_and_reset() {
        let (mut captcha, widget) = captcha();
        widget.0.borrow_mut().available = true;
        captcha.load();

        captcha.handle(CaptchaEvent::Verified("token-1".into()));
        assert!(captcha.is_verified());
        assert_eq!(captcha.token(), Some("token-1"));
        assert_eq!(captcha.error(), None);

        captcha.handle(CaptchaEvent::Failed);
        assert_eq!(captcha.token(), None);
        assert_eq!(captcha.error(), Some(MSG_VERIFICATION_FAILED));

        captcha.reset();
        assert_eq!(captcha.state(), &CaptchaState::Rendered);
        assert_eq!(widget.0.borrow().resets, vec![7]);
        assert_eq!(captcha.error(), None);
    }

    #[test]
    fn report_own_transitions() {
        let (mut captcha, widget) = captcha();
        assert_eq!(captcha.load(), LoadOutcome::Pending);
        assert!(captcha.take_events().is_empty());

        widget.0.borrow_mut().available = true;
        captcha.render();
        captcha.render();
        assert_eq!(captcha.take_events(), vec![CaptchaEvent::Rendered]);
        assert!(captcha.take_events().is_empty());

        // widget callbacks are not echoed
        captcha.handle(CaptchaEvent::Verified("tok".into()));
        assert!(captcha.take_events().is_empty());

        captcha.reset();
        assert_eq!(captcha.take_events(), vec![CaptchaEvent::Reset]);
    }

    #[test]
    fn keep_load_callback_while_script_is_loading() {
        let (mut captcha, widget) = captcha();
        captcha.load();
        captcha.teardown();
        assert!(!widget.0.borrow().callback_removed);
    }

    #[test]
    fn teardown_removes_load_callback() {
        let (mut captcha, widget) = captcha();
        captcha.load();
        widget.0.borrow_mut().available = true;
        captcha.render();
        captcha.teardown();
        assert!(widget.0.borrow().callback_removed);
    }
}
