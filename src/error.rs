use std::fmt::Display;

use alloy::{
    contract,
    primitives::{Bytes, TxHash},
    providers::PendingTransactionError,
    rpc::types::TransactionReceipt,
    sol_types::{self, SolInterface},
    transports,
};

use crate::abi::perpetual::LidoAPYPerpetual::LidoAPYPerpetualErrors;

pub type PerpError = ProviderError<LidoAPYPerpetualErrors>;

/// Call/transaction revert reason decoded by
/// the provided known ABI or in a generic raw form
/// if can not be decoded.
#[derive(Debug)]
pub enum RevertReason<R> {
    Known(R),
    Generic(String),
    Unknown,
}

/// Error returned by the RPC provider as a result of call or
/// transaction execution.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError<R> {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0:?}")]
    Reverted(Box<RevertReason<R>>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out")]
    Timeout,

    #[error("block out of order, expected: {0}, got: {1}")]
    BlockOutOfOrder(u64, u64),
}

impl<R> ProviderError<R> {
    /// Whether the error is caused by the block not being produced yet
    /// and the request is worth repeating later.
    pub fn is_block_pending(&self) -> bool {
        matches!(self, Self::InvalidRequest(msg) if msg == BLOCK_NOT_AVAILABLE)
    }
}

pub(crate) const BLOCK_NOT_AVAILABLE: &str = "block is not available yet";

/// Hash of the mined transaction, or [`ProviderError::Reverted`] if the
/// receipt reports failure.
pub fn confirmed<R>(receipt: &TransactionReceipt) -> Result<TxHash, ProviderError<R>> {
    if !receipt.status() {
        return Err(ProviderError::Reverted(Box::new(RevertReason::Unknown)));
    }
    Ok(receipt.transaction_hash)
}

impl<R: SolInterface> From<contract::Error> for ProviderError<R> {
    fn from(value: contract::Error) -> Self {
        match value {
            contract::Error::UnknownFunction(_) => Self::Fatal(value.to_string()),
            contract::Error::UnknownSelector(_) => Self::Fatal(value.to_string()),
            contract::Error::NotADeploymentTransaction => Self::Fatal(value.to_string()),
            contract::Error::ContractNotDeployed => Self::Fatal(value.to_string()),
            contract::Error::ZeroData(_, _) => Self::Fatal(value.to_string()),
            contract::Error::AbiError(_) => Self::Fatal(value.to_string()),
            contract::Error::TransportError(rpc_err) => Self::from(rpc_err),
            contract::Error::PendingTransactionError(err) => err.into(),
        }
    }
}

impl<R: SolInterface> From<PendingTransactionError> for ProviderError<R> {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            PendingTransactionError::FailedToRegister => Self::Fatal(value.to_string()),
            PendingTransactionError::TransportError(rpc_err) => Self::from(rpc_err),
            PendingTransactionError::Recv(_) => Self::Transport(value.to_string()),
            PendingTransactionError::TxWatcher(err) => match err {
                alloy::providers::WatchTxError::Timeout => Self::Timeout,
            },
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for ProviderError<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Node implementations disagree on error codes, so the message
                // text is checked as well
                let msg = resp.message.to_ascii_lowercase();
                if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if ((resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found")))
                    || (resp.code == -32603
                        && (msg.contains("block by number") || msg.contains("getting block")))
                {
                    Self::InvalidRequest(msg)
                } else if resp.code == 3 && msg.contains("reverted") {
                    Self::Reverted(Box::new(RevertReason::from(value)))
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<sol_types::Error> for ProviderError<R> {
    fn from(value: sol_types::Error) -> Self {
        Self::Fatal(value.to_string())
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for RevertReason<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value.as_error_resp() {
            Some(payload) => match payload.as_decoded_interface_error::<R>() {
                Some(known) => Self::Known(known),
                None => Self::Generic(value.to_string()),
            },
            None => Self::Generic(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<Bytes> for RevertReason<R> {
    fn from(value: Bytes) -> Self {
        if value.is_empty() {
            return Self::Unknown;
        }
        match R::abi_decode(&value) {
            Ok(known) => Self::Known(known),
            Err(_) => Self::Generic(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::Address, sol_types::SolError};

    use super::*;
    use crate::abi::perpetual::LidoAPYPerpetual::OwnableUnauthorizedAccount;

    #[test]
    fn test_revert_reason_decodes_known_error() {
        let account = Address::repeat_byte(0x11);
        let data = Bytes::from(OwnableUnauthorizedAccount { account }.abi_encode());
        match RevertReason::<LidoAPYPerpetualErrors>::from(data) {
            RevertReason::Known(LidoAPYPerpetualErrors::OwnableUnauthorizedAccount(err)) => {
                assert_eq!(err.account, account)
            }
            other => panic!("unexpected revert reason: {other:?}"),
        }
    }

    #[test]
    fn test_revert_reason_falls_back_to_generic() {
        let data = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            RevertReason::<LidoAPYPerpetualErrors>::from(data),
            RevertReason::Generic(_)
        ));
        assert!(matches!(
            RevertReason::<LidoAPYPerpetualErrors>::from(Bytes::new()),
            RevertReason::Unknown
        ));
    }

    fn receipt(status: &str) -> TransactionReceipt {
        serde_json::from_value(serde_json::json!({
            "type": "0x2",
            "status": status,
            "cumulativeGasUsed": "0x5208",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "transactionHash": "0x47de82c4aa40baa30cabac4a74568488a8c74ded85a4e905f1ceaad4f29945e3",
            "transactionIndex": "0x0",
            "blockHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x64",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0xa16081f360e3847006db660bae1c6d1b2e17ec2a",
            "contractAddress": null
        }))
        .unwrap()
    }

    #[test]
    fn test_confirmed_receipt() {
        let tx_hash = confirmed::<LidoAPYPerpetualErrors>(&receipt("0x1")).unwrap();
        assert_eq!(
            tx_hash,
            alloy::primitives::b256!(
                "0x47de82c4aa40baa30cabac4a74568488a8c74ded85a4e905f1ceaad4f29945e3"
            )
        );
    }

    #[test]
    fn test_reverted_receipt() {
        assert!(matches!(
            confirmed::<LidoAPYPerpetualErrors>(&receipt("0x0")),
            Err(ProviderError::Reverted(reason)) if matches!(*reason, RevertReason::Unknown)
        ));
    }

    #[test]
    fn test_block_pending_detection() {
        assert!(PerpError::InvalidRequest(BLOCK_NOT_AVAILABLE.to_string()).is_block_pending());
        assert!(!PerpError::InvalidRequest("block not found".to_string()).is_block_pending());
        assert!(!PerpError::Timeout.is_block_pending());
    }
}
