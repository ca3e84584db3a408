//! revert 数据解码
//!
//! 把节点返回的原始 revert 数据解成可读原因：`Error(string)`、`Panic(uint256)`
//! 以及注册合约已知的自定义错误。解码结果拼接到原始错误文本后再交给分类器。

use ethers::{
    abi::{ParamType, Token},
    types::U256,
};

use crate::{
    error::ErrorCategory,
    infrastructure::abi::{decode_tokens, selector},
    service::error_classifier::classify,
};

const ERROR_STRING_SIG: &str = "Error(string)";
const PANIC_SIG: &str = "Panic(uint256)";

/// 节点把 `Error(string)` 原因直接写进消息时的前缀
const EXECUTION_REVERTED_PREFIX: &str = "execution reverted:";

/// 注册合约的自定义错误（签名，可读描述）
const KNOWN_CUSTOM_ERRORS: &[(&str, &str)] = &[
    ("DomainNotAvailable()", "domain not available"),
    ("FidAlreadyRegistered()", "fid already registered"),
    ("InvalidFarcasterFid()", "invalid farcaster fid"),
    ("InsufficientPayment()", "insufficient payment"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `require(cond, "message")`
    Message(String),
    /// 编译器插入的 panic（溢出、除零等）
    Panic(U256),
    /// 已知自定义错误：(名称, 描述)
    Custom(&'static str, &'static str),
    /// 未识别的 4 字节选择器
    UnknownSelector([u8; 4]),
    /// 无数据的 revert
    Empty,
}

impl RevertReason {
    /// 可读描述
    pub fn describe(&self) -> String {
        match self {
            Self::Message(msg) => msg.clone(),
            Self::Panic(code) => format!("panic code {:#x}", code),
            Self::Custom(name, description) => format!("{} ({})", name, description),
            Self::UnknownSelector(sel) => format!("custom error 0x{}", hex::encode(sel)),
            Self::Empty => "reverted without reason".to_string(),
        }
    }

    /// 合约明确给出的名称不可用原因
    pub fn is_name_unavailable(&self) -> bool {
        match self {
            Self::Custom(name, _) => *name == "DomainNotAvailable",
            Self::Message(msg) => classify(msg) == ErrorCategory::NameUnavailable,
            _ => false,
        }
    }
}

/// 解码 0x 十六进制 revert 数据；非十六进制返回 None
pub fn decode_revert_data(data: &str) -> Option<RevertReason> {
    let bytes = hex::decode(data.trim().trim_start_matches("0x")).ok()?;
    Some(decode_revert_bytes(&bytes))
}

pub fn decode_revert_bytes(bytes: &[u8]) -> RevertReason {
    if bytes.len() < 4 {
        return RevertReason::Empty;
    }

    let (sel, payload) = bytes.split_at(4);

    if sel == selector(ERROR_STRING_SIG) {
        if let Ok(tokens) = decode_tokens(&[ParamType::String], payload) {
            if let Some(Token::String(msg)) = tokens.into_iter().next() {
                return RevertReason::Message(msg);
            }
        }
    }

    if sel == selector(PANIC_SIG) {
        if let Ok(tokens) = decode_tokens(&[ParamType::Uint(256)], payload) {
            if let Some(Token::Uint(code)) = tokens.into_iter().next() {
                return RevertReason::Panic(code);
            }
        }
    }

    for &(sig, description) in KNOWN_CUSTOM_ERRORS {
        if sel == selector(sig) {
            let name = sig.trim_end_matches("()");
            return RevertReason::Custom(name, description);
        }
    }

    let mut unknown = [0u8; 4];
    unknown.copy_from_slice(sel);
    RevertReason::UnknownSelector(unknown)
}

/// 合约给出的 revert 原因
///
/// 优先解码 revert 数据；没有可用数据时只接受节点消息中 `execution reverted: <原因>` 的原因部分。
/// 其余节点错误文本不视为合约原因。
pub fn revert_reason(raw: &str, revert_data: Option<&str>) -> Option<RevertReason> {
    match revert_data.and_then(decode_revert_data) {
        Some(RevertReason::Empty) | None => {}
        Some(reason) => return Some(reason),
    }

    let start = raw
        .to_ascii_lowercase()
        .find(EXECUTION_REVERTED_PREFIX)?
        + EXECUTION_REVERTED_PREFIX.len();
    let message = raw[start..].trim();
    (!message.is_empty()).then(|| RevertReason::Message(message.to_string()))
}

/// 原始错误文本 + 解码后的原因
pub fn annotate(raw: &str, revert_data: Option<&str>) -> String {
    match revert_data.and_then(decode_revert_data) {
        Some(RevertReason::Empty) | None => raw.to_string(),
        Some(reason) => format!("{} [reason: {}]", raw, reason.describe()),
    }
}
