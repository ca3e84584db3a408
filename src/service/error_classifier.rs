//! 错误分类器
//!
//! 按固定顺序用正则匹配原始错误文本，返回第一个命中的分类，全部未命中返回 Unknown。
//! 总函数：任何输入都恰好返回一个分类，不会 panic。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ErrorCategory;

/// 有序规则表；顺序即优先级
static RULES: Lazy<Vec<(ErrorCategory, Regex)>> = Lazy::new(|| {
    let specs: &[(ErrorCategory, &str)] = &[
        (
            ErrorCategory::InsufficientFunds,
            r"(?i)insufficient[\s_]*(funds|payment)",
        ),
        (
            ErrorCategory::InsufficientBalance,
            r"(?i)insufficient[\s_]*(balance|allowance)|exceeds[\s_]*(balance|allowance)",
        ),
        (
            ErrorCategory::NameUnavailable,
            r"(?i)\b(domain|name)[\s_]*(is[\s_]*)?(not[\s_]*available|unavailable)|\b(domain|name)[\s_]+\S+[\s_]+is[\s_]+not[\s_]+available|already[\s_]+(taken|claimed)|\b(domain|name)[\s_]+(is[\s_]+)?already[\s_]+registered",
        ),
        (
            ErrorCategory::InvalidIdentity,
            r"(?i)invalid[\s_]*(farcaster[\s_]*)?fid|fid[\s_]*already[\s_]*registered|invalid[\s_]*identity",
        ),
        (
            ErrorCategory::ChainMismatch,
            r"(?i)chain[\s_]*mismatch|wrong[\s_]*(chain|network)|unrecognized[\s_]*(chain|network)|not on (celo|the (target|expected|correct) (chain|network))|network[\s_]*changed|chain[\s_]*id[\s_]*mismatch",
        ),
        (
            ErrorCategory::ContractRevertGeneric,
            r"(?i)revert|call[\s_]*exception|execution[\s_]*failed",
        ),
    ];

    specs
        .iter()
        .filter_map(|(category, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*category, re)),
            Err(e) => {
                tracing::error!(category = %category, error = %e, "Invalid classifier pattern");
                None
            }
        })
        .collect()
});

/// 把原始错误文本映射到错误分类
pub fn classify(raw_error: &str) -> ErrorCategory {
    RULES
        .iter()
        .find(|(_, re)| re.is_match(raw_error))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Unknown)
}
