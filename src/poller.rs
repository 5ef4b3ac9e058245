use std::time::{Duration, Instant};

use ethers::types::{Address, U256};
use tracing::debug;

use crate::chain::ChainAccessor;
use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls `address` on `chain` until its balance differs from `baseline`,
/// in either direction; the delta amount is never checked. Fails with
/// `DeadlineExceeded` once the overall deadline elapses.
pub async fn wait_for_balance_change(
    chain: &dyn ChainAccessor,
    address: Address,
    baseline: U256,
    deadline: Duration,
    poll_interval: Duration,
) -> PipelineResult<()> {
    debug!("Waiting for balance change...");
    let start = Instant::now();
    loop {
        if start.elapsed() > deadline {
            return Err(PipelineError::DeadlineExceeded);
        }

        let balance = chain.balance(address).await?;
        if balance != baseline {
            debug!("{baseline} WEI -> {balance} WEI");
            return Ok(());
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TxPayload;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedChain {
        balances: Mutex<VecDeque<U256>>,
        last: U256,
    }

    impl ScriptedChain {
        fn new(balances: &[u64], last: u64) -> Self {
            Self {
                balances: Mutex::new(balances.iter().map(|b| U256::from(*b)).collect()),
                last: U256::from(last),
            }
        }
    }

    #[async_trait]
    impl ChainAccessor for ScriptedChain {
        fn address(&self) -> Address {
            Address::zero()
        }

        async fn balance(&self, _address: Address) -> PipelineResult<U256> {
            Ok(self.balances.lock().unwrap().pop_front().unwrap_or(self.last))
        }

        async fn network_id(&self) -> PipelineResult<u64> {
            Ok(1)
        }

        async fn send_transaction(&self, _payload: &TxPayload) -> PipelineResult<String> {
            unimplemented!("not used by the poller")
        }
    }

    #[tokio::test]
    async fn returns_on_first_differing_poll() {
        let chain = ScriptedChain::new(&[100, 100], 150);
        wait_for_balance_change(
            &chain,
            Address::zero(),
            U256::from(100u64),
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn any_delta_counts_including_a_decrease() {
        // Detection is change-based, not deposit-based: an unrelated
        // outgoing transfer satisfies the wait just as a deposit does.
        let chain = ScriptedChain::new(&[], 40);
        wait_for_balance_change(
            &chain,
            Address::zero(),
            U256::from(100u64),
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn zero_deadline_with_a_static_balance_times_out() {
        let chain = ScriptedChain::new(&[], 100);
        let result = wait_for_balance_change(
            &chain,
            Address::zero(),
            U256::from(100u64),
            Duration::ZERO,
            Duration::from_millis(1),
        )
        .await;
        assert!(matches!(result, Err(PipelineError::DeadlineExceeded)));
    }
}
