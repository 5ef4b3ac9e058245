use thiserror::Error;

/// Terminal failure of a single wallet's funding pipeline.
///
/// Every variant aborts only the wallet it was raised for; the batch loop
/// records that wallet as failed and continues with the next one.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("provider reports chain id {actual}, expected {expected}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("{0} is not supported for exchange withdrawals")]
    UnsupportedChain(String),

    #[error("bridge aggregator unavailable after {attempts} attempts (check debug log for details)")]
    BridgeUnavailable { attempts: u32 },

    #[error("unexpected bridge target address: {0}")]
    UnexpectedTarget(String),

    #[error("relayer fee ({fee_eth} ETH) exceeds user limit ({limit_eth} ETH)")]
    FeeTooHigh { fee_eth: f64, limit_eth: f64 },

    #[error("deadline for balance change wait was reached")]
    DeadlineExceeded,

    #[error("exchange returned no withdrawal id: {0}")]
    ExchangeWithdrawalFailed(String),

    #[error("malformed wallet line: {0}")]
    MalformedWalletLine(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Expected terminal conditions (validation refusals, elapsed
    /// deadlines) as opposed to transport or RPC faults. Only the latter
    /// are worth retrying.
    pub fn is_expected(&self) -> bool {
        !matches!(self, PipelineError::Other(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_conditions_are_tagged() {
        assert!(PipelineError::DeadlineExceeded.is_expected());
        assert!(
            PipelineError::FeeTooHigh {
                fee_eth: 0.01,
                limit_eth: 0.001
            }
            .is_expected()
        );
        assert!(!PipelineError::Other(anyhow::anyhow!("connection reset")).is_expected());
    }

    #[test]
    fn messages_carry_the_relevant_numbers() {
        let err = PipelineError::NetworkMismatch {
            expected: 10,
            actual: 1,
        };
        assert_eq!(err.to_string(), "provider reports chain id 1, expected 10");
    }
}
