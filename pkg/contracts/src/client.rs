use std::{future::Future, time::Duration};

use crate::{Error, Result, MAX_RETRIES};
use ethereum_types::{Address, H256, U64};
use tokio::time::interval;
use tracing::warn;
use web3::{
    contract::{tokens::Tokenize, Contract, Options},
    ethabi,
    signing::SecretKey,
    transports::Http,
    types::{Transaction, U256},
    Web3,
};

/// A thin `web3` client with bounded retry on transport failures
#[derive(Debug, Clone)]
pub struct Client {
    client: Web3<Http>,
    chain_id: u64,
}

impl Client {
    pub fn new(rpc: &str, chain_id: u64) -> Result<Client> {
        let client = Web3::new(Http::new(rpc)?);
        Ok(Client { client, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn client(&self) -> &Web3<Http> {
        &self.client
    }

    /// Build a contract handle from an inline ABI document
    pub fn contract_at(&self, address: Address, abi_json: &str) -> Result<Contract<Http>> {
        let abi = serde_json::from_str::<ethabi::Contract>(abi_json)?;
        Ok(Contract::new(self.client.eth(), address, abi))
    }

    pub async fn block_number(&self) -> Result<u64> {
        let number = retry_rpc(|| self.client.eth().block_number()).await?;
        Ok(number.as_u64())
    }

    /// Sign and submit a state-changing contract call
    pub async fn call(
        &self,
        contract: &Contract<Http>,
        func: &str,
        params: impl Tokenize + Clone,
        signer: &SecretKey,
        signer_address: Address,
    ) -> Result<H256> {
        let gas_price: U256 = retry_rpc(|| self.client.eth().gas_price()).await?;
        let nonce = retry_rpc(|| {
            self.client
                .eth()
                .transaction_count(signer_address, Some(web3::types::BlockNumber::Pending))
        })
        .await?;

        let options = Options {
            gas: Some(10_000_000.into()),
            gas_price: Some(gas_price * 2),
            nonce: Some(nonce),
            ..Default::default()
        };

        let call_tx = retry_rpc(move || contract.signed_call(func, params, options, signer))
            .await
            .map_err(Error::from)?;

        Ok(call_tx)
    }

    /// Wait for a transaction to confirm and return its block number
    ///
    /// Gives up with [`Error::UnknownTransaction`] when the transaction has
    /// been unknown to the node for 60 seconds.
    #[tracing::instrument(err, skip(self))]
    pub async fn wait_for_confirm(&self, txn_hash: H256, interval_period: Duration) -> Result<U64> {
        let unknown_timeout = std::time::Instant::now() + Duration::from_secs(60);

        let mut interval = interval(interval_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let tx = retry_rpc(|| {
                self.client
                    .eth()
                    .transaction(web3::types::TransactionId::Hash(txn_hash))
            })
            .await?;

            match tx {
                None => {
                    if std::time::Instant::now() > unknown_timeout {
                        return Err(Error::UnknownTransaction(txn_hash));
                    }
                }
                Some(Transaction {
                    block_number: None, ..
                }) => {
                    // still pending
                }
                Some(Transaction {
                    block_number: Some(block_number),
                    ..
                }) => {
                    return Ok(block_number);
                }
            }
        }
    }
}

pub(crate) trait IsNetworkFailure {
    fn is_network_failure(&self) -> bool;
}

impl IsNetworkFailure for web3::error::Error {
    fn is_network_failure(&self) -> bool {
        matches!(self, web3::error::Error::Transport(_))
    }
}

impl IsNetworkFailure for web3::contract::Error {
    fn is_network_failure(&self) -> bool {
        matches!(
            self,
            web3::contract::Error::Api(web3::error::Error::Transport(_))
        )
    }
}

/// Retry an RPC call up to [`MAX_RETRIES`] times with exponentially growing,
/// capped delays
///
/// Only transport failures are retried; everything else (reverts, decoding
/// problems) surfaces immediately.
pub(crate) async fn retry_rpc<T, E, Fut>(f: impl FnOnce() -> Fut + Clone) -> Result<T, E>
where
    E: IsNetworkFailure,
    Fut: Future<Output = Result<T, E>>,
{
    const CAP: Duration = Duration::from_secs(16);

    let mut result = (f.clone())().await;

    for attempt in 1..MAX_RETRIES {
        match &result {
            Err(err) if err.is_network_failure() => {
                let delay = Duration::from_secs(1 << (attempt - 1)).min(CAP);
                warn!(attempt, ?delay, "transport failure, retrying");
                tokio::time::sleep(delay).await;

                result = (f.clone())().await;
            }
            _ => break,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use web3::error::{Error, TransportError};

    use super::*;

    async fn run_with_failures(succeed_at: u32) -> (Result<(), Error>, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        tokio::time::pause();

        let result = retry_rpc(move || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let call = calls.fetch_add(1, Ordering::Relaxed) + 1;
                if call == succeed_at {
                    Ok(())
                } else {
                    Err(Error::Transport(TransportError::Code(call as u16)))
                }
            }
        })
        .await;

        (result, calls.load(Ordering::Relaxed))
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_cap() {
        let (result, calls) = run_with_failures(u32::MAX).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(calls, MAX_RETRIES);
    }

    #[tokio::test]
    async fn stops_retrying_on_success() {
        let (result, calls) = run_with_failures(3).await;

        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn first_try_success_never_sleeps() {
        let (result, calls) = run_with_failures(1).await;

        assert!(result.is_ok());
        assert_eq!(calls, 1);
    }
}
