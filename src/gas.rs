use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::chain::GasPriceSource;
use crate::error::PipelineResult;
use crate::random;

/// Ceiling ramp for the mainnet gas wait. The ceiling starts at
/// `start_gwei` and rises by `step_gwei` every `ramp_minutes` until it
/// reaches `max_gwei`; a price that stays above `max_gwei` blocks forever.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasRampConfig {
    pub start_gwei: f64,
    pub step_gwei: f64,
    pub ramp_minutes: f64,
    pub max_gwei: f64,
    pub min_poll_sec: u64,
    pub max_poll_sec: u64,
}

impl Default for GasRampConfig {
    fn default() -> Self {
        Self {
            start_gwei: 5.0,
            step_gwei: 1.0,
            ramp_minutes: 2.0,
            max_gwei: 10.0,
            min_poll_sec: 30,
            max_poll_sec: 60,
        }
    }
}

/// Blocks until the reference chain's gas price is at or below the
/// current ceiling. The ratchet state lives only inside this call; every
/// invocation restarts from `start_gwei`.
pub async fn wait_for_gas(source: &dyn GasPriceSource, ramp: &GasRampConfig) -> PipelineResult<()> {
    let mut ceiling = ramp.start_gwei;
    let ramp_interval = Duration::from_secs_f64(ramp.ramp_minutes * 60.0);
    let mut next_increase = Instant::now() + ramp_interval;

    info!("Waiting for gas...");
    loop {
        if Instant::now() >= next_increase && ramp.step_gwei != 0.0 && ceiling < ramp.max_gwei {
            let raised = (ceiling + ramp.step_gwei).min(ramp.max_gwei);
            info!("Increasing max gas {ceiling} -> {raised} GWEI");
            ceiling = raised;
            next_increase = Instant::now() + ramp_interval;
        }

        let price = source.gas_price_gwei().await?;
        if price <= ceiling {
            debug!("current gas is {price:.1}, my current max is {ceiling}");
            info!("gas ok, proceeding");
            return Ok(());
        }

        debug!("current gas is {price:.1}, my current max is {ceiling}, waiting...");
        let pause = random::rand_int(ramp.min_poll_sec, ramp.max_poll_sec);
        tokio::time::sleep(Duration::from_secs(pause)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGas {
        prices: Mutex<VecDeque<f64>>,
        last: f64,
        fetches: AtomicUsize,
    }

    impl ScriptedGas {
        fn new(prices: &[f64], last: f64) -> Self {
            Self {
                prices: Mutex::new(prices.iter().copied().collect()),
                last,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GasPriceSource for ScriptedGas {
        async fn gas_price_gwei(&self) -> PipelineResult<f64> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.prices.lock().unwrap().pop_front().unwrap_or(self.last))
        }
    }

    fn fast_ramp(start: f64, step: f64, max: f64) -> GasRampConfig {
        GasRampConfig {
            start_gwei: start,
            step_gwei: step,
            ramp_minutes: 0.0,
            max_gwei: max,
            min_poll_sec: 0,
            max_poll_sec: 0,
        }
    }

    #[tokio::test]
    async fn returns_on_first_acceptable_price() {
        let source = ScriptedGas::new(&[], 4.2);
        let ramp = GasRampConfig {
            ramp_minutes: 10.0,
            ..GasRampConfig::default()
        };
        wait_for_gas(&source, &ramp).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ceiling_ratchets_until_the_price_fits() {
        // start 5, step 1, instant ramp: the gate admits 8 gwei on the
        // fetch where the ceiling has climbed to 8.
        let source = ScriptedGas::new(&[20.0, 20.0, 8.0], 8.0);
        wait_for_gas(&source, &fast_ramp(5.0, 1.0, 10.0)).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn ceiling_never_exceeds_the_configured_max() {
        // A big step would overshoot; the ramp clamps at max and the gate
        // only admits once the price drops to it.
        let source = ScriptedGas::new(&[11.0, 10.0], 10.0);
        wait_for_gas(&source, &fast_ramp(5.0, 7.0, 10.0)).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn blocks_while_price_stays_above_max() {
        let source = ScriptedGas::new(&[], 10.5);
        let ramp = fast_ramp(5.0, 1.0, 10.0);
        let gate = wait_for_gas(&source, &ramp);
        let outcome = tokio::time::timeout(Duration::from_millis(50), gate).await;
        assert!(outcome.is_err(), "gate must not admit a price above max");
    }

    #[tokio::test]
    async fn zero_step_disables_the_ratchet() {
        let source = ScriptedGas::new(&[6.0, 5.0], 5.0);
        wait_for_gas(&source, &fast_ramp(5.0, 0.0, 10.0)).await.unwrap();
        // 6 gwei was rejected against the un-raised ceiling of 5
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
