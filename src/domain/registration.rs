//! 注册请求参数与本地校验（不访问网络）

use ethers::types::Address;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::AddressValidator;

/// 标签规则：小写字母、数字、下划线，1..=63 个字符
static LABEL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z0-9_]{1,63}$").ok());

pub const MAX_LABEL_LEN: usize = 63;

/// 注册请求（每次提交创建一次，之后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationParams {
    pub label: String,
    /// Farcaster FID；存在时必须为正整数
    #[serde(default)]
    pub identity_id: Option<u64>,
    pub owner: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: Option<String>,
}

/// 校验失败：收集全部问题，而不是只报第一个
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid params: {}", problems.join(", "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl RegistrationParams {
    pub fn new(label: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            identity_id: None,
            owner: owner.into(),
            bio: None,
            social_links: None,
        }
    }

    pub fn with_identity(mut self, identity_id: u64) -> Self {
        self.identity_id = Some(identity_id);
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_social_links(mut self, social_links: impl Into<String>) -> Self {
        self.social_links = Some(social_links.into());
        self
    }

    /// 校验并返回解析后的 owner 地址
    pub fn validate(&self) -> Result<Address, ValidationError> {
        let mut problems = Vec::new();

        if let Some(problem) = label_problem(&self.label) {
            problems.push(problem.to_string());
        }

        if self.identity_id == Some(0) {
            problems.push("Identity id must be a positive integer".to_string());
        }

        let owner = AddressValidator::parse_evm_address(self.owner.trim());
        if owner.is_none() {
            problems.push("Valid owner address is required".to_string());
        }

        match owner {
            Some(owner) if problems.is_empty() => Ok(owner),
            _ => Err(ValidationError { problems }),
        }
    }

    /// 完整名称：label + "." + 后缀
    pub fn full_name(&self, suffix: &str) -> String {
        full_name(&self.label, suffix)
    }

    pub fn bio_or_empty(&self) -> &str {
        self.bio.as_deref().unwrap_or("")
    }

    pub fn social_links_or_empty(&self) -> &str {
        self.social_links.as_deref().unwrap_or("")
    }
}

pub fn full_name(label: &str, suffix: &str) -> String {
    format!("{}.{}", label, suffix.trim_start_matches('.'))
}

/// 标签合法时返回 None
pub fn label_problem(label: &str) -> Option<&'static str> {
    if label.is_empty() {
        return Some("Label cannot be empty");
    }
    if label.len() > MAX_LABEL_LEN {
        return Some("Label must be max 63 characters");
    }
    match LABEL_RE.as_ref() {
        Some(re) if re.is_match(label) => None,
        _ => Some("Label must only contain lowercase letters, numbers, and underscores"),
    }
}
