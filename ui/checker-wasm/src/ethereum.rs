//! EIP-1193 binding for the injected `window.ethereum` object.

use async_trait::async_trait;
use ec_provider::{
    AccountsSubscription, ListenerRegistry, ProviderError, RpcErrorObject, SubscriptionId,
    WalletProvider,
};
use ec_types::{AccountAddress, Wei};
use js_sys::{Array, Function, Object, Promise, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

const ACCOUNTS_CHANGED: &str = "accountsChanged";

pub struct Eip1193Provider {
    ethereum: JsValue,
    registry: Rc<ListenerRegistry>,
    // One JS listener fans out to every live subscription.
    listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
}

impl Eip1193Provider {
    /// Returns `None` when the page has no injected wallet.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self {
            ethereum,
            registry: Rc::new(ListenerRegistry::default()),
            listener: RefCell::new(None),
        })
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
    }

    async fn request(&self, method: &str, params: Array) -> Result<JsValue, ProviderError> {
        let request = self.method("request").ok_or(ProviderError::Unavailable)?;

        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(js_error)?;
        Reflect::set(&args, &JsValue::from_str("params"), &params).map_err(js_error)?;

        let promise: Promise = request
            .call1(&self.ethereum, &args)
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| ProviderError::InvalidResponse(format!("{method} did not return a promise")))?;

        JsFuture::from(promise).await.map_err(js_error)
    }

    async fn request_account_list(&self, method: &str) -> Result<Vec<AccountAddress>, ProviderError> {
        let value = self.request(method, Array::new()).await?;
        parse_accounts(value)
    }
}

fn parse_accounts(value: JsValue) -> Result<Vec<AccountAddress>, ProviderError> {
    serde_wasm_bindgen::from_value(value).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
}

/// Turns a rejected promise value into the provider error taxonomy.
fn js_error(value: JsValue) -> ProviderError {
    if let Ok(err) = serde_wasm_bindgen::from_value::<RpcErrorObject>(value.clone()) {
        return err.into();
    }
    ProviderError::Transport(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

#[async_trait(?Send)]
impl WalletProvider for Eip1193Provider {
    fn name(&self) -> &str {
        "eip-1193"
    }

    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.request_account_list("eth_accounts").await
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.request_account_list("eth_requestAccounts").await
    }

    async fn balance(&self, account: &AccountAddress) -> Result<Wei, ProviderError> {
        let params = Array::of2(&JsValue::from_str(account.as_str()), &JsValue::from_str("latest"));
        let value = self.request("eth_getBalance", params).await?;
        let quantity = value
            .as_string()
            .ok_or_else(|| ProviderError::InvalidResponse("eth_getBalance result is not a string".to_owned()))?;
        Ok(Wei::parse(&quantity)?)
    }

    fn subscribe_accounts_changed(&self) -> Result<AccountsSubscription, ProviderError> {
        let subscription = self.registry.subscribe();
        if self.listener.borrow().is_some() {
            return Ok(subscription);
        }

        let Some(on) = self.method("on") else {
            self.registry.remove(subscription.id());
            return Err(ProviderError::Unavailable);
        };

        let registry = Rc::clone(&self.registry);
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match parse_accounts(value) {
                Ok(accounts) => {
                    registry.notify(&accounts);
                }
                Err(err) => gloo_console::warn!(format!("ignoring malformed accountsChanged payload: {err}")),
            }
        });

        if let Err(err) = on.call2(
            &self.ethereum,
            &JsValue::from_str(ACCOUNTS_CHANGED),
            closure.as_ref().unchecked_ref(),
        ) {
            self.registry.remove(subscription.id());
            return Err(js_error(err));
        }

        *self.listener.borrow_mut() = Some(closure);
        Ok(subscription)
    }

    fn remove_listener(&self, id: SubscriptionId) {
        self.registry.remove(id);
        if !self.registry.is_empty() {
            return;
        }
        let Some(closure) = self.listener.borrow_mut().take() else {
            return;
        };
        match self.method("removeListener") {
            Some(remove) => {
                let _ = remove.call2(
                    &self.ethereum,
                    &JsValue::from_str(ACCOUNTS_CHANGED),
                    closure.as_ref().unchecked_ref(),
                );
            }
            // The wallet keeps calling it; with no senders left it is inert.
            None => closure.forget(),
        }
    }
}
