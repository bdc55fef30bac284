//! Construction of the contract call submitted every block.
use alloy::{
    primitives::{Address, Bytes, TxKind, U256, keccak256},
    rpc::types::{TransactionInput, TransactionRequest},
};
use eyre::{Result, ensure};

/// A validated description of the contract call bundled on every block.
///
/// Construction performs the shape and fee checks that can be done without
/// touching the network; [`CallSpec::to_tx_request`] is then a pure function
/// of the spec. Whether the selector actually exists on the target contract
/// is NOT checked here - a bad selector surfaces as an on-chain revert at
/// inclusion time, never at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    target: Address,
    calldata: Bytes,
    value: U256,
    max_fee_per_gas: u128,
    max_priority_fee_per_gas: u128,
    gas_limit: u64,
    chain_id: u64,
}

impl CallSpec {
    /// Create a new [`CallSpec`], deriving the calldata from the function
    /// signature and the pre-encoded argument bytes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: Address,
        signature: &str,
        args: Bytes,
        value: U256,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
        gas_limit: u64,
        chain_id: u64,
    ) -> Result<Self> {
        let selector = selector(signature)?;

        ensure!(
            max_priority_fee_per_gas <= max_fee_per_gas,
            "priority fee ceiling {max_priority_fee_per_gas} exceeds fee ceiling {max_fee_per_gas}"
        );
        ensure!(gas_limit > 0, "gas limit must be nonzero");

        let mut calldata = Vec::with_capacity(4 + args.len());
        calldata.extend_from_slice(&selector);
        calldata.extend_from_slice(&args);

        Ok(Self {
            target,
            calldata: calldata.into(),
            value,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            gas_limit,
            chain_id,
        })
    }

    /// The address of the called contract.
    pub const fn target(&self) -> Address {
        self.target
    }

    /// The full calldata: selector plus encoded arguments.
    pub const fn calldata(&self) -> &Bytes {
        &self.calldata
    }

    /// The 4-byte selector routing the call.
    pub fn selector(&self) -> &[u8] {
        &self.calldata[..4]
    }

    /// Builds the EIP-1559 transaction descriptor for one submission
    /// attempt.
    ///
    /// Deterministic: identical specs yield identical requests. The nonce is
    /// deliberately left unset; the fill provider assigns it at signing
    /// time.
    pub fn to_tx_request(&self) -> TransactionRequest {
        TransactionRequest {
            to: Some(TxKind::Call(self.target)),
            value: Some(self.value),
            input: TransactionInput::new(self.calldata.clone()),
            chain_id: Some(self.chain_id),
            max_fee_per_gas: Some(self.max_fee_per_gas),
            max_priority_fee_per_gas: Some(self.max_priority_fee_per_gas),
            gas: Some(self.gas_limit),
            transaction_type: Some(2),
            ..Default::default()
        }
    }
}

/// Derives the 4-byte function selector from a Solidity function signature
/// such as `mint()` or `transfer(address,uint256)`.
pub fn selector(signature: &str) -> Result<[u8; 4]> {
    let open = signature.find('(');
    ensure!(
        open.is_some_and(|idx| idx > 0) && signature.ends_with(')'),
        "malformed function signature: {signature:?}"
    );
    ensure!(
        !signature.contains(char::is_whitespace),
        "function signature must not contain whitespace: {signature:?}"
    );

    let hash = keccak256(signature.as_bytes());
    Ok([hash[0], hash[1], hash[2], hash[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_call_spec;

    #[test]
    fn derives_known_selector() {
        // keccak256("mint()")[..4]
        assert_eq!(selector("mint()").unwrap(), [0x12, 0x49, 0xc5, 0x8b]);
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(selector("").is_err());
        assert!(selector("mint").is_err());
        assert!(selector("()").is_err());
        assert!(selector("mint ()").is_err());
    }

    #[test]
    fn rejects_inverted_fee_ceilings() {
        let res = CallSpec::new(
            Address::repeat_byte(0x42),
            "mint()",
            Bytes::new(),
            U256::from(1),
            1_000_000_000,
            2_000_000_000,
            21_000,
            5,
        );
        assert!(res.is_err());
    }

    #[test]
    fn rejects_zero_gas_limit() {
        let res = CallSpec::new(
            Address::repeat_byte(0x42),
            "mint()",
            Bytes::new(),
            U256::from(1),
            2_000_000_000,
            1_000_000_000,
            0,
            5,
        );
        assert!(res.is_err());
    }

    #[test]
    fn appends_args_to_selector() {
        let args = Bytes::from(vec![0xaa; 32]);
        let spec = CallSpec::new(
            Address::repeat_byte(0x42),
            "mint()",
            args.clone(),
            U256::ZERO,
            2,
            1,
            21_000,
            5,
        )
        .unwrap();

        assert_eq!(spec.selector(), &[0x12, 0x49, 0xc5, 0x8b]);
        assert_eq!(spec.calldata().len(), 4 + args.len());
        assert_eq!(&spec.calldata()[4..], &args[..]);
    }

    #[test]
    fn descriptor_is_deterministic() {
        let spec = test_call_spec();
        assert_eq!(spec.to_tx_request(), spec.to_tx_request());
        assert_eq!(spec, spec.clone());
    }

    #[test]
    fn descriptor_carries_configured_values() {
        let spec = test_call_spec();
        let req = spec.to_tx_request();

        assert_eq!(req.to, Some(TxKind::Call(spec.target())));
        assert_eq!(req.transaction_type, Some(2));
        assert_eq!(req.chain_id, Some(5));
        assert_eq!(req.max_fee_per_gas, Some(3_000_000_000));
        assert_eq!(req.max_priority_fee_per_gas, Some(2_000_000_000));
        assert_eq!(req.gas, Some(2_201_501));
        assert_eq!(req.nonce, None);
    }
}
