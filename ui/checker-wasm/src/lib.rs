//! Ether Account Checker WASM frontend.
//!
//! Binds the injected EIP-1193 wallet to a [`WalletStatusController`] and
//! renders its status into `#app-container`.

pub mod dom;
pub mod ethereum;
pub mod events;
pub mod render;

use ec_wallet_core::{CONNECT_PROMPT, WalletStatusController};
use wasm_bindgen::prelude::*;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();

    init().await
}

async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;

    let controller = WalletStatusController::new(ethereum::Eip1193Provider::detect());
    if !controller.has_provider() {
        gloo_console::log!(CONNECT_PROMPT);
    }

    render::render_status(&els, &controller.status());
    render::spawn_renderer(&els, controller.subscribe());
    events::bind_events(&els, &controller)?;

    controller.initialize().await;

    // Runs until teardown closes the notification stream.
    wasm_bindgen_futures::spawn_local(async move {
        controller.listen().await;
    });

    Ok(())
}
