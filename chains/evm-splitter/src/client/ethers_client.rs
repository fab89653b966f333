use super::{ChainClient, ChainError, Confirmation, ContractCall, GasParams};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Transport and confirmation timing for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(180),
            poll_interval: Duration::from_millis(1500),
        }
    }
}

/// [`ChainClient`] over an ethers HTTP provider.
#[derive(Debug, Clone)]
pub struct EthersClient {
    provider: Provider<Http>,
    endpoint: String,
    chain_id: u64,
    settings: ClientSettings,
}

impl EthersClient {
    /// Opens the transport and reads the chain id, which doubles as the
    /// reachability check.
    pub async fn connect(endpoint: &str, settings: ClientSettings) -> Result<Self, ChainError> {
        let provider = build_provider(endpoint, &settings)?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| connection_error(endpoint, e))?
            .as_u64();

        debug!("Connected to {} (chain id {})", endpoint, chain_id);

        Ok(Self {
            provider,
            endpoint: endpoint.to_string(),
            chain_id,
            settings,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map(|b| b.as_u64())
            .map_err(|e| connection_error(&self.endpoint, e))
    }

    async fn sign_and_send(&self, signer: &LocalWallet, tx: TransactionRequest) -> Result<H256, ChainError> {
        let typed: TypedTransaction = tx.into();
        let signature = signer
            .sign_transaction(&typed)
            .await
            .map_err(|e| ChainError::Submission(format!("signing failed: {}", e)))?;
        let raw = typed.rlp_signed(&signature);

        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        Ok(pending.tx_hash())
    }
}

/// HTTP provider with explicit request and connect timeouts.
pub(crate) fn build_provider(endpoint: &str, settings: &ClientSettings) -> Result<Provider<Http>, ChainError> {
    let url = Url::parse(endpoint).map_err(|e| connection_error(endpoint, e))?;

    let client = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(|e| connection_error(endpoint, e))?;

    Ok(Provider::new(Http::new_with_client(url, client)).interval(settings.poll_interval))
}

fn connection_error(endpoint: &str, e: impl std::fmt::Display) -> ChainError {
    ChainError::Connection {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn suggested_gas_price(&self) -> Result<U256, ChainError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| connection_error(&self.endpoint, e))
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Option<Bytes>,
    ) -> Result<U256, ChainError> {
        let mut tx = TransactionRequest::new().from(from).to(to).value(value);
        if let Some(data) = data {
            tx = tx.data(data);
        }
        let typed: TypedTransaction = tx.into();

        self.provider
            .estimate_gas(&typed, None)
            .await
            .map_err(|e| ChainError::Estimation(e.to_string()))
    }

    async fn next_nonce(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| connection_error(&self.endpoint, e))
    }

    async fn submit_contract_call(
        &self,
        signer: &LocalWallet,
        call: &ContractCall,
        gas: GasParams,
    ) -> Result<H256, ChainError> {
        let nonce = self
            .next_nonce(signer.address())
            .await
            .map_err(|e| ChainError::Submission(format!("nonce lookup failed: {}", e)))?;

        let tx = TransactionRequest::new()
            .from(signer.address())
            .to(call.to)
            .value(call.value)
            .data(call.data.clone())
            .nonce(nonce)
            .gas(gas.gas_limit)
            .gas_price(gas.gas_price)
            .chain_id(self.chain_id);

        self.sign_and_send(signer, tx).await
    }

    async fn submit_direct_transfer(
        &self,
        signer: &LocalWallet,
        to: Address,
        value: U256,
        nonce: U256,
        gas: GasParams,
    ) -> Result<H256, ChainError> {
        let tx = TransactionRequest::new()
            .from(signer.address())
            .to(to)
            .value(value)
            .nonce(nonce)
            .gas(gas.gas_limit)
            .gas_price(gas.gas_price)
            .chain_id(self.chain_id);

        self.sign_and_send(signer, tx).await
    }

    async fn wait_confirmed(&self, tx_hash: H256) -> Result<Confirmation, ChainError> {
        let deadline = Instant::now() + self.settings.confirmation_timeout;

        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(Confirmation::from_receipt(&receipt)),
                Ok(None) => {}
                // Transient RPC errors while polling are not fatal
                Err(e) => debug!("Receipt lookup for {:?} failed: {}", tx_hash, e),
            }

            if Instant::now() >= deadline {
                return Err(ChainError::Confirmation(format!(
                    "{:?} not included within {}s",
                    tx_hash,
                    self.settings.confirmation_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider_rejects_bad_url() {
        let err = build_provider("not a url", &ClientSettings::default()).unwrap_err();
        assert!(matches!(err, ChainError::Connection { .. }));
    }

    #[test]
    fn test_build_provider_accepts_http_url() {
        assert!(build_provider("https://bsc-dataseed.binance.org/", &ClientSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_connect_unreachable_endpoint_fails() {
        let settings = ClientSettings {
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let result = EthersClient::connect("http://127.0.0.1:1", settings).await;
        assert!(matches!(result, Err(ChainError::Connection { .. })));
    }
}
