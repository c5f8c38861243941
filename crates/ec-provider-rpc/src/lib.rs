use async_trait::async_trait;
use ec_provider::{
    AccountsSubscription, ListenerRegistry, ProviderConfig, ProviderError, RpcErrorObject,
    SubscriptionId, WalletProvider,
};
use ec_types::{AccountAddress, Wei};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use tracing::{debug, warn};

/// JSON-RPC code for "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

/// Wallet provider backed by a remote JSON-RPC node.
///
/// Nodes have no push channel, so account-change subscriptions are accepted
/// but never fire.
pub struct HttpRpcProvider {
    url: String,
    http: reqwest::Client,
    next_id: Cell<u64>,
    listeners: ListenerRegistry,
}

impl Default for HttpRpcProvider {
    fn default() -> Self {
        Self::new(&ProviderConfig::from_env())
    }
}

impl HttpRpcProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            url: config.rpc_url(),
            http: reqwest::Client::new(),
            next_id: Cell::new(1),
            listeners: ListenerRegistry::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ProviderError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(method, id, "json-rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method}: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method}: {err}")))?;

        // Nodes report JSON-RPC errors with a 200 as well as with 4xx/5xx bodies.
        match decode_response(&text) {
            Ok(value) => Ok(value),
            Err(err) if status.is_success() => Err(err),
            Err(ProviderError::InvalidResponse(_)) => Err(ProviderError::Transport(format!(
                "{method}: HTTP {status}: {text}"
            ))),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::InvalidResponse(format!("{err}: {body}")))?;

    if let Some(err) = response.error {
        return Err(err.into());
    }

    let result = response
        .result
        .ok_or_else(|| ProviderError::InvalidResponse("response has neither result nor error".to_owned()))?;
    serde_json::from_value(result).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
}

#[async_trait(?Send)]
impl WalletProvider for HttpRpcProvider {
    fn name(&self) -> &str {
        "json-rpc"
    }

    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.call("eth_accounts", Value::Array(Vec::new())).await
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        match self
            .call("eth_requestAccounts", Value::Array(Vec::new()))
            .await
        {
            Err(ProviderError::Rpc { code, message }) if code == METHOD_NOT_FOUND => {
                warn!(%message, "node does not support eth_requestAccounts, using eth_accounts");
                self.accounts().await
            }
            other => other,
        }
    }

    async fn balance(&self, account: &AccountAddress) -> Result<Wei, ProviderError> {
        let quantity: String = self
            .call("eth_getBalance", serde_json::json!([account.as_str(), "latest"]))
            .await?;
        Ok(Wei::from_hex_quantity(&quantity)?)
    }

    fn subscribe_accounts_changed(&self) -> Result<AccountsSubscription, ProviderError> {
        Ok(self.listeners.subscribe())
    }

    fn remove_listener(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider_for(server: &mockito::ServerGuard) -> HttpRpcProvider {
        HttpRpcProvider::new(&ProviderConfig::new(server.url(), None))
    }

    #[test]
    fn decode_maps_error_objects() {
        let err = decode_response::<Vec<AccountAddress>>(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
        )
        .unwrap_err();
        assert_eq!(err, ProviderError::Rejected("User rejected the request.".to_owned()));

        let err = decode_response::<String>(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn reads_accounts_and_balance() {
        let mut server = mockito::Server::new_async().await;
        let accounts_mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "eth_accounts"})))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":["0xAAA","0xDDD"]}"#)
            .create_async()
            .await;
        let balance_mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "method": "eth_getBalance",
                "params": ["0xAAA", "latest"]
            })))
            .with_body(r#"{"jsonrpc":"2.0","id":2,"result":"0x22b1c8c1227a0000"}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let accounts = provider.accounts().await.unwrap();
        assert_eq!(accounts, vec![AccountAddress::from("0xAAA"), AccountAddress::from("0xDDD")]);

        let wei = provider.balance(&accounts[0]).await.unwrap();
        assert_eq!(wei, Wei(2_500_000_000_000_000_000));

        accounts_mock.assert_async().await;
        balance_mock.assert_async().await;
    }

    #[tokio::test]
    async fn request_accounts_falls_back_when_unsupported() {
        let mut server = mockito::Server::new_async().await;
        let _request = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "eth_requestAccounts"})))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#)
            .create_async()
            .await;
        let _accounts = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "eth_accounts"})))
            .with_body(r#"{"jsonrpc":"2.0","id":2,"result":["0xBBB"]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let accounts = provider.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![AccountAddress::from("0xBBB")]);
    }

    #[tokio::test]
    async fn http_failure_is_a_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.accounts().await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)), "got {err:?}");
    }

    #[test]
    fn api_key_is_part_of_the_url() {
        let provider = HttpRpcProvider::new(&ProviderConfig::new(
            "https://goerli.infura.io/v3",
            Some("abc123".to_owned()),
        ));
        assert_eq!(provider.url(), "https://goerli.infura.io/v3/abc123");
    }
}
