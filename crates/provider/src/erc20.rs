//! The fixed four-method ERC-20 probe interface.
//!
//! Encoding/decoding only; issuing the calls and deciding whether a
//! contract qualifies as a token is the classifier's job.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

pub fn name_call() -> Bytes {
    Bytes::from(IERC20::nameCall {}.abi_encode())
}

pub fn symbol_call() -> Bytes {
    Bytes::from(IERC20::symbolCall {}.abi_encode())
}

pub fn decimals_call() -> Bytes {
    Bytes::from(IERC20::decimalsCall {}.abi_encode())
}

pub fn total_supply_call() -> Bytes {
    Bytes::from(IERC20::totalSupplyCall {}.abi_encode())
}

pub fn decode_name(data: &[u8]) -> Option<String> {
    IERC20::nameCall::abi_decode_returns(data).ok()
}

pub fn decode_symbol(data: &[u8]) -> Option<String> {
    IERC20::symbolCall::abi_decode_returns(data).ok()
}

pub fn decode_decimals(data: &[u8]) -> Option<u8> {
    IERC20::decimalsCall::abi_decode_returns(data).ok()
}

pub fn decode_total_supply(data: &[u8]) -> Option<U256> {
    IERC20::totalSupplyCall::abi_decode_returns(data).ok()
}
