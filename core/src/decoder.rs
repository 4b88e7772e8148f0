//! Request decoder
//!
//! Two-phase decode: the header `type` picks the variant, then the body is
//! parsed into that variant's wire shape and validated. Unknown types are
//! rejected before the body is touched.

use std::str::FromStr;

use alloy_primitives::{hex, Address, Bytes, U256};
use serde::de::DeserializeOwned;

use crate::error::TxnError;
use crate::messages::{
    CommonHeaders, ContractCode, DeployContract, RawDeployContract, RawNumber,
    RawSendTransaction, RawTxnCommon, SendTransaction, TxnCommon, TxnRequest,
    MSG_TYPE_DEPLOY_CONTRACT, MSG_TYPE_SEND_TRANSACTION,
};

/// Decode a raw message body according to its declared header type.
pub fn decode_request(headers: &CommonHeaders, body: &[u8]) -> Result<TxnRequest, TxnError> {
    match headers.msg_type.as_str() {
        MSG_TYPE_DEPLOY_CONTRACT => {
            let raw: RawDeployContract = parse_body(body)?;
            decode_deploy(headers, raw).map(TxnRequest::DeployContract)
        }
        MSG_TYPE_SEND_TRANSACTION => {
            let raw: RawSendTransaction = parse_body(body)?;
            decode_send(headers, raw).map(TxnRequest::SendTransaction)
        }
        other => Err(TxnError::UnknownMessageType(other.to_string())),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TxnError> {
    serde_json::from_slice(body).map_err(|e| TxnError::MalformedPayload(e.to_string()))
}

fn decode_deploy(headers: &CommonHeaders, raw: RawDeployContract) -> Result<DeployContract, TxnError> {
    let common = decode_common(headers, &raw.common)?;

    let code = match (raw.compiled, raw.abi, raw.solidity) {
        (Some(compiled), Some(abi), _) if !compiled.is_empty() => {
            let bytecode = hex::decode(compiled.trim())
                .map_err(|e| TxnError::InvalidCode(e.to_string()))?;
            ContractCode::Compiled {
                bytecode: Bytes::from(bytecode),
                abi,
            }
        }
        (_, _, Some(source)) if !source.trim().is_empty() => ContractCode::Solidity {
            source,
            contract_name: raw.contract_name,
        },
        _ => return Err(TxnError::MissingCode),
    };

    Ok(DeployContract {
        common,
        code,
        parameters: raw.parameters,
    })
}

fn decode_send(headers: &CommonHeaders, raw: RawSendTransaction) -> Result<SendTransaction, TxnError> {
    let common = decode_common(headers, &raw.common)?;

    let to = match raw.to.as_deref().map(str::trim) {
        None | Some("") => return Err(TxnError::MissingTarget),
        Some(to) => Address::from_str(to).map_err(|e| TxnError::InvalidTarget(e.to_string()))?,
    };

    let method = match raw.method {
        Some(method) if !method.name.is_empty() => method,
        _ => return Err(TxnError::MissingMethod),
    };

    Ok(SendTransaction { common, to, method })
}

/// Validate the fields both variants share. `from` is checked first so a
/// request missing everything reports the sender.
fn decode_common(headers: &CommonHeaders, raw: &RawTxnCommon) -> Result<TxnCommon, TxnError> {
    let from = match raw.from.as_deref().map(str::trim) {
        None | Some("") => return Err(TxnError::MissingSender),
        Some(from) => Address::from_str(from).map_err(|e| TxnError::InvalidSender(e.to_string()))?,
    };

    let nonce = raw
        .nonce
        .as_ref()
        .map(|n| parse_u64(n).map_err(TxnError::InvalidNonce))
        .transpose()?;

    let value = raw
        .value
        .as_ref()
        .map(|v| parse_u256(v).map_err(TxnError::InvalidValue))
        .transpose()?;

    let gas = match &raw.gas {
        None => return Err(TxnError::MissingGas),
        Some(g) => parse_u64(g).map_err(TxnError::InvalidGas)?,
    };

    let gas_price = raw
        .gas_price
        .as_ref()
        .map(|p| parse_u256(p).map_err(TxnError::InvalidGasPrice))
        .transpose()?;

    Ok(TxnCommon {
        headers: headers.clone(),
        from,
        nonce,
        value,
        gas,
        gas_price,
    })
}

/// Digits only: no sign, no whitespace inside, no radix prefix
fn decimal_text(raw: &RawNumber) -> Result<String, String> {
    let text = raw.as_text();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a decimal integer", text));
    }
    Ok(text)
}

fn parse_u64(raw: &RawNumber) -> Result<u64, String> {
    let text = decimal_text(raw)?;
    text.parse::<u64>().map_err(|e| format!("'{}': {}", text, e))
}

fn parse_u256(raw: &RawNumber) -> Result<U256, String> {
    let text = decimal_text(raw)?;
    U256::from_str_radix(&text, 10).map_err(|e| format!("'{}': {}", text, e))
}
