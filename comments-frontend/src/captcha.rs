//! reCAPTCHA v2 (explicit rendering) in the browser.

use std::{cell::RefCell, rc::Rc};

use js_sys::{Object, Reflect};
use leptos::*;
use wasm_bindgen::prelude::*;
use web_sys::HtmlScriptElement;

use comments_core::captcha::{Captcha, CaptchaConfig, CaptchaEvent, CaptchaWidget, WidgetId};

const SCRIPT_ID: &str = "recaptcha-script";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = grecaptcha, js_name = render)]
    fn grecaptcha_render(container: &str, parameters: &Object) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = grecaptcha, js_name = reset)]
    fn grecaptcha_reset(widget_id: WidgetId) -> Result<(), JsValue>;
}

/// Set once the provider script called its global load callback.
#[derive(Debug, Clone, Copy)]
pub struct ProviderLoaded(pub RwSignal<bool>);

type JsCallback = Closure<dyn Fn(JsValue)>;

pub struct RecaptchaWidget {
    events: WriteSignal<Option<CaptchaEvent>>,
    loaded: RwSignal<bool>,
    // dropping a closure invalidates it on the JS side
    callbacks: RefCell<Vec<JsCallback>>,
}

impl RecaptchaWidget {
    #[must_use]
    pub fn new(events: WriteSignal<Option<CaptchaEvent>>, loaded: RwSignal<bool>) -> Self {
        Self {
            events,
            loaded,
            callbacks: RefCell::default(),
        }
    }

    fn inject_script(&self, config: &CaptchaConfig) -> Result<(), JsValue> {
        let window = window();
        let loaded = self.loaded;
        let on_load: JsCallback = Closure::new(move |_: JsValue| {
            log::debug!("CAPTCHA script loaded");
            loaded.set(true);
        });
        Reflect::set(
            &window,
            &JsValue::from_str(&config.load_callback),
            on_load.as_ref(),
        )?;
        self.callbacks.borrow_mut().push(on_load);

        let document = document();
        if document.get_element_by_id(SCRIPT_ID).is_some() {
            return Ok(());
        }
        let script: HtmlScriptElement = document.create_element("script")?.unchecked_into();
        script.set_id(SCRIPT_ID);
        script.set_src(&config.script_url());
        script.set_async(true);
        script.set_defer(true);
        document
            .head()
            .ok_or_else(|| JsValue::from_str("Missing document head"))?
            .append_child(&script)?;
        Ok(())
    }
}

impl CaptchaWidget for RecaptchaWidget {
    fn is_available(&self) -> bool {
        Reflect::get(&window(), &JsValue::from_str("grecaptcha"))
            .and_then(|provider| Reflect::get(&provider, &JsValue::from_str("render")))
            .is_ok_and(|render| render.is_function())
    }

    fn load_script(&self, config: &CaptchaConfig) {
        if let Err(err) = self.inject_script(config) {
            log::error!("Unable to load CAPTCHA script: {}", js_error(&err));
        }
    }

    fn render(&self, config: &CaptchaConfig) -> Result<WidgetId, String> {
        let events = self.events;
        let verified: JsCallback = Closure::new(move |token: JsValue| {
            let event = token
                .as_string()
                .map_or(CaptchaEvent::Failed, CaptchaEvent::Verified);
            events.set(Some(event));
        });
        let expired: JsCallback =
            Closure::new(move |_: JsValue| events.set(Some(CaptchaEvent::Expired)));
        let failed: JsCallback =
            Closure::new(move |_: JsValue| events.set(Some(CaptchaEvent::Failed)));

        let parameters = Object::new();
        for (key, value) in [
            ("sitekey", &JsValue::from_str(&config.site_key)),
            ("callback", verified.as_ref()),
            ("expired-callback", expired.as_ref()),
            ("error-callback", failed.as_ref()),
        ] {
            Reflect::set(&parameters, &JsValue::from_str(key), value)
                .map_err(|err| js_error(&err))?;
        }
        let widget_id =
            grecaptcha_render(&config.container_id, &parameters).map_err(|err| js_error(&err))?;
        self.callbacks
            .borrow_mut()
            .extend([verified, expired, failed]);
        #[allow(clippy::cast_possible_truncation)]
        widget_id
            .as_f64()
            .map(|id| id as WidgetId)
            .ok_or_else(|| "Unexpected widget id".to_string())
    }

    fn reset(&self, widget_id: WidgetId) {
        if let Err(err) = grecaptcha_reset(widget_id) {
            log::warn!("Unable to reset CAPTCHA widget: {}", js_error(&err));
        }
    }

    fn remove_load_callback(&self, config: &CaptchaConfig) {
        let name = JsValue::from_str(&config.load_callback);
        if let Err(err) = Reflect::delete_property(&window(), &name) {
            log::warn!("Unable to remove CAPTCHA load callback: {}", js_error(&err));
        }
    }
}

fn js_error(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

#[component]
pub fn Recaptcha(
    /// Id of the element the widget is rendered into.
    container_id: String,
    #[prop(into)] on_event: Callback<CaptchaEvent>,
    /// Every change resets the widget.
    #[prop(into)]
    reset: Signal<usize>,
) -> impl IntoView {
    let loaded = use_context::<ProviderLoaded>().map_or_else(|| RwSignal::new(false), |l| l.0);
    let (event, set_event) = create_signal(None::<CaptchaEvent>);
    let error = RwSignal::new(None::<&'static str>);

    let config = CaptchaConfig {
        container_id: container_id.clone(),
        ..Default::default()
    };
    let captcha = store_value(Rc::new(RefCell::new(Captcha::new(
        RecaptchaWidget::new(set_event, loaded),
        config,
    ))));

    // -- effects -- //

    Effect::new(move |_| {
        if loaded.get() {
            log::debug!("CAPTCHA provider ready");
        }
        request_animation_frame(move || {
            let events = captcha.with_value(|c| {
                let mut c = c.borrow_mut();
                let outcome = c.load();
                log::debug!("CAPTCHA load: {outcome:?}");
                error.set(c.error());
                c.take_events()
            });
            for ev in events {
                on_event.call(ev);
            }
        });
    });

    Effect::new(move |_| {
        if let Some(ev) = event.get() {
            captcha.with_value(|c| {
                let mut c = c.borrow_mut();
                c.handle(ev.clone());
                error.set(c.error());
            });
            on_event.call(ev);
        }
    });

    Effect::new(move |prev: Option<usize>| {
        let count = reset.get();
        if prev.is_some_and(|prev| prev != count) {
            let events = captcha.with_value(|c| {
                let mut c = c.borrow_mut();
                c.reset();
                error.set(c.error());
                c.take_events()
            });
            for ev in events {
                on_event.call(ev);
            }
        }
        count
    });

    on_cleanup(move || {
        captcha.try_with_value(|c| c.borrow_mut().teardown());
    });

    view! {
      <div class="captcha">
        <div id=container_id></div>
        {move || error.get().map(|msg| view! { <p class="error">{ msg }</p> })}
      </div>
    }
}
