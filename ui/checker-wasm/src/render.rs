//! Applies [`StatusView`] output to the page.

use crate::dom::Elements;
use ec_status_view::StatusView;
use ec_wallet_core::WalletStatus;
use tokio::sync::watch;

pub fn render_status(els: &Elements, status: &WalletStatus) {
    els.root
        .set_inner_html(&StatusView::render(status).to_html());
}

/// Re-renders on every published status change until the controller is gone.
pub fn spawn_renderer(els: &Elements, mut updates: watch::Receiver<WalletStatus>) {
    let els = els.clone();
    wasm_bindgen_futures::spawn_local(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            render_status(&els, &status);
        }
    });
}
