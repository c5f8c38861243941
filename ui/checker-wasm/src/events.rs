//! Event binding.
//!
//! Buttons are re-created on every render, so clicks are handled by one
//! delegated listener on the root element.

use crate::dom::{self, Elements};
use crate::ethereum::Eip1193Provider;
use ec_status_view::CONNECT_ACTION;
use ec_wallet_core::WalletStatusController;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

type Controller = WalletStatusController<Eip1193Provider>;

/// Helper: attach a listener for `$event` that lives as long as the page.
macro_rules! on_event {
    ($target:expr, $event:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::Event)>);
        $target.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements, controller: &Controller) -> Result<(), JsValue> {
    // ── Connect ──
    {
        let controller = controller.clone();
        let selector = format!("[data-action=\"{CONNECT_ACTION}\"]");
        on_event!(els.root, "click", move |event: web_sys::Event| {
            if dom::closest_from_event(&event, &selector).is_none() {
                return;
            }
            let controller = controller.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = controller.request_connection().await {
                    gloo_console::warn!(format!("wallet connection failed: {err}"));
                }
            });
        });
    }

    // ── Teardown ──
    {
        let controller = controller.clone();
        on_event!(dom::window()?, "pagehide", move |_: web_sys::Event| {
            controller.teardown();
        });
    }

    Ok(())
}
