//! Contract compilation and ABI encoding seams
//!
//! Both are provided by the embedding application. The defaults refuse with
//! an error so a deploy of precompiled code without constructor arguments
//! works out of the box.

use alloy_primitives::Bytes;
use serde_json::Value;

use crate::messages::MethodCall;

/// Output of compiling a contract
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub bytecode: Bytes,
    pub abi: Value,
}

/// Compiles Solidity source to deployable bytecode
pub trait ContractCompiler: Send + Sync {
    fn compile(&self, source: &str, contract_name: Option<&str>) -> Result<CompiledContract, String>;
}

/// ABI-encodes method calls and constructor arguments
pub trait CallEncoder: Send + Sync {
    /// Selector plus encoded arguments for a method call
    fn encode_call(&self, method: &MethodCall) -> Result<Bytes, String>;

    /// Encoded constructor arguments, appended to the bytecode
    fn encode_constructor(&self, abi: &Value, params: &[Value]) -> Result<Bytes, String>;
}

/// Used when no compiler is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompiler;

impl ContractCompiler for NoCompiler {
    fn compile(&self, _source: &str, _contract_name: Option<&str>) -> Result<CompiledContract, String> {
        Err("no Solidity compiler is configured; supply 'compiled' and 'abi'".to_string())
    }
}

/// Used when no ABI encoder is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEncoder;

impl CallEncoder for NoEncoder {
    fn encode_call(&self, method: &MethodCall) -> Result<Bytes, String> {
        Err(format!("no ABI encoder is configured for method '{}'", method.name))
    }

    fn encode_constructor(&self, _abi: &Value, _params: &[Value]) -> Result<Bytes, String> {
        Err("no ABI encoder is configured for constructor parameters".to_string())
    }
}
