use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ethers::types::Address;
use tracing::{debug, error, info};

use crate::bridge::BridgeAccessor;
use crate::chain::{ChainAccessor, ChainConnector, GasPriceSource, address_from_private_key};
use crate::config::Config;
use crate::error::PipelineResult;
use crate::exchange::ExchangeAccessor;
use crate::gas;
use crate::notify::{self, NotificationSender};
use crate::poller;
use crate::queue::QueueState;
use crate::random;
use crate::types::{FundingJob, PipelineState, WalletRecord};

/// Collaborators injected into the batch run. The orchestrator only ever
/// sees the capability traits, never the concrete clients.
pub struct Collaborators {
    pub exchange: Arc<dyn ExchangeAccessor>,
    pub notifier: Arc<dyn NotificationSender>,
    pub connector: Arc<dyn ChainConnector>,
    pub gas_source: Arc<dyn GasPriceSource>,
    pub bridge: Arc<dyn BridgeAccessor>,
}

pub struct Pipeline {
    config: Config,
    deps: Collaborators,
}

impl Pipeline {
    pub fn new(config: Config, deps: Collaborators) -> Self {
        Self { config, deps }
    }

    /// Runs the whole batch: every remaining wallet goes through the full
    /// funding pipeline, the queue files are rewritten after each one, and
    /// a randomized pause separates consecutive wallets.
    pub async fn run(&self) -> Result<()> {
        let mut queue = QueueState::load(Path::new(&self.config.wallets_file))?;
        info!("Loaded {} wallets", queue.remaining.len());

        let mut order = queue.remaining.clone();
        if self.config.shuffle_wallets {
            random::shuffle(&mut order);
        }

        let total = order.len();
        for (idx, line) in order.iter().enumerate() {
            let name = WalletRecord::parse(line)
                .map(|record| record.name)
                .unwrap_or_else(|_| line.clone());

            match self.process_wallet(line).await {
                Ok(bridged_eth) => {
                    debug!("{name} - pipeline finished, bridged {bridged_eth} ETH");
                    queue.mark_succeeded(line);
                }
                Err(e) => {
                    if e.is_expected() {
                        error!("{name} - failed to topup mainnet, reason: {e}");
                    } else {
                        // transport/RPC faults keep their full context chain
                        error!("{name} - failed to topup mainnet, reason: {e:#}");
                    }
                    self.deps
                        .notifier
                        .notify_all(&notify::failure_message(&name, &e.to_string()))
                        .await;
                    queue.mark_failed(line);
                }
            }
            queue.persist()?;
            info!("Progress: {}/{} wallets processed", idx + 1, total);

            let pause = random::rand_int(
                self.config.delays.min_between_wallets_sec,
                self.config.delays.max_between_wallets_sec,
            );
            info!("Sleeping {:.2} minutes...", pause as f64 / 60.0);
            tokio::time::sleep(Duration::from_secs(pause)).await;
        }

        Ok(())
    }

    /// One wallet, start to finish. Returns the bridged amount; any error
    /// terminates only this wallet's run.
    async fn process_wallet(&self, line: &str) -> PipelineResult<f64> {
        let record = WalletRecord::parse(line)?;
        let address = address_from_private_key(&record.private_key)?;

        let origin = random::random_choice(&self.config.topup_chains);
        let amounts = &self.config.withdraw_amounts;
        let topup_eth = random::rand_float_with_dec(
            amounts.min_amount,
            amounts.max_amount,
            amounts.min_decimals,
            amounts.max_decimals,
        );
        let share = random::rand_float(self.config.bridge_share.min, self.config.bridge_share.max);
        let bridge_eth = random::round_to_appropriate_decimals(
            topup_eth * share,
            self.config.bridge_share.min_decimals,
            self.config.bridge_share.max_decimals,
        );

        let mut job = FundingJob::new(
            record,
            format!("{address:#x}"),
            origin,
            topup_eth,
            bridge_eth,
        );

        match self.execute(&mut job, address).await {
            Ok(()) => {
                job.advance(PipelineState::Succeeded);
                Ok(job.bridge_amount_eth)
            }
            Err(e) => {
                job.advance(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &mut FundingJob, address: Address) -> PipelineResult<()> {
        let name = job.record.name.clone();
        let proxy = job.record.proxy.clone();

        let origin_chain =
            self.deps
                .connector
                .connect(job.origin_chain, &job.record.private_key, proxy.as_deref())?;
        let dest_chain = self.deps.connector.connect(
            job.destination_chain,
            &job.record.private_key,
            proxy.as_deref(),
        )?;

        if self.config.wait_for_gas_for_topup {
            job.advance(PipelineState::GasGate);
            gas::wait_for_gas(self.deps.gas_source.as_ref(), &self.config.gas_prices).await?;
        }

        let deadline = Duration::from_secs(self.config.balance_change_deadline_sec);

        let baseline = origin_chain.balance(address).await?;
        debug!("{name} - balance before cex topup: {baseline} WEI");

        job.advance(PipelineState::Withdrawing);
        info!(
            "{name} - topping up wallet, address: {}, chain: {}, amount: {} ETH",
            job.address, job.origin_chain, job.topup_amount_eth
        );
        let wdid = self
            .deps
            .exchange
            .withdraw(&job.address, "ETH", job.origin_chain, job.topup_amount_eth)
            .await?;
        info!("{name} - successfully withdrew ETH from CEX, wdid: {wdid}");

        job.advance(PipelineState::AwaitingOriginDeposit);
        poller::wait_for_balance_change(
            origin_chain.as_ref(),
            address,
            baseline,
            deadline,
            poller::DEFAULT_POLL_INTERVAL,
        )
        .await?;
        info!("{name} - wallet received ETH");

        job.advance(PipelineState::PreBridgeDelay);
        let pause = random::rand_int(
            self.config.delays.min_after_withdraw_sec,
            self.config.delays.max_after_withdraw_sec,
        );
        info!("{name} - sleeping {:.2} minutes...", pause as f64 / 60.0);
        tokio::time::sleep(Duration::from_secs(pause)).await;

        job.advance(PipelineState::GasGate);
        gas::wait_for_gas(self.deps.gas_source.as_ref(), &self.config.gas_prices).await?;

        let dest_baseline = dest_chain.balance(address).await?;
        debug!("{name} - balance before relay: {dest_baseline} WEI");

        job.advance(PipelineState::Bridging);
        info!(
            "{name} - relaying {} ETH to mainnet",
            job.bridge_amount_eth
        );
        let hash = self
            .deps
            .bridge
            .bridge_eth(
                origin_chain.as_ref(),
                job.origin_chain,
                job.destination_chain,
                job.bridge_amount_eth,
                self.config.max_relayer_fee_eth,
                proxy.as_deref(),
            )
            .await?;
        info!("{name} - successfully sent relay tx, hash: {hash}");

        job.advance(PipelineState::AwaitingDestinationDeposit);
        poller::wait_for_balance_change(
            dest_chain.as_ref(),
            address,
            dest_baseline,
            deadline,
            poller::DEFAULT_POLL_INTERVAL,
        )
        .await?;
        info!("{name} - mainnet topped up");

        job.advance(PipelineState::Notifying);
        self.deps
            .notifier
            .notify_all(&notify::success_message(&name, job.bridge_amount_eth))
            .await;

        Ok(())
    }
}
