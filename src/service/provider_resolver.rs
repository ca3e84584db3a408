//! 钱包 Provider 发现
//!
//! 按固定优先级探测候选来源（迷你应用钱包桥 → 通用注入钱包），
//! 都不可用时通过 `poll_for` 按固定间隔有界重试。只读、无副作用，可重复调用。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::infrastructure::{poll_for, ProviderRpcError, WalletProvider};

/// 迷你应用宿主注入的钱包桥
pub const MINIAPP_BRIDGE_SOURCE: &str = "miniapp_bridge";
/// 浏览器/宿主全局注入的通用钱包
pub const INJECTED_SOURCE: &str = "injected";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("No wallet provider available after {attempts} attempts")]
    Unavailable { attempts: u32 },

    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Wallet returned an invalid account: {0}")]
    InvalidAccount(String),

    #[error(transparent)]
    Rpc(#[from] ProviderRpcError),
}

/// Provider 候选来源
#[async_trait]
pub trait ProviderSource: Send + Sync {
    fn name(&self) -> &str;

    /// 当前可用则返回能力句柄
    async fn probe(&self) -> Option<Arc<dyn WalletProvider>>;
}

/// 由宿主在 Provider 出现时填充的候选槽位
pub struct ProviderSlot {
    name: String,
    slot: RwLock<Option<Arc<dyn WalletProvider>>>,
}

impl ProviderSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: RwLock::new(None),
        }
    }

    pub fn with_provider(name: impl Into<String>, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            name: name.into(),
            slot: RwLock::new(Some(provider)),
        }
    }

    pub async fn install(&self, provider: Arc<dyn WalletProvider>) {
        *self.slot.write().await = Some(provider);
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

#[async_trait]
impl ProviderSource for ProviderSlot {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Option<Arc<dyn WalletProvider>> {
        self.slot.read().await.clone()
    }
}

/// 解析结果：能力句柄 + 来源名
#[derive(Clone)]
pub struct ResolvedProvider {
    pub source: String,
    pub provider: Arc<dyn WalletProvider>,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

pub struct ProviderResolver {
    candidates: Vec<Arc<dyn ProviderSource>>,
    interval: Duration,
    max_attempts: u32,
}

impl ProviderResolver {
    /// 候选按传入顺序即优先级
    pub fn new(candidates: Vec<Arc<dyn ProviderSource>>) -> Self {
        Self {
            candidates,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.interval = interval;
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.name()).collect()
    }

    /// 一轮按优先级探测
    async fn probe_once(&self) -> Option<ResolvedProvider> {
        for candidate in &self.candidates {
            if let Some(provider) = candidate.probe().await {
                return Some(ResolvedProvider {
                    source: candidate.name().to_string(),
                    provider,
                });
            }
        }
        None
    }

    pub async fn resolve(&self) -> Result<ResolvedProvider, ProviderError> {
        let resolved = poll_for(|| self.probe_once(), self.interval, self.max_attempts).await;

        match resolved {
            Some(resolved) => {
                tracing::debug!(source = %resolved.source, "Wallet provider resolved");
                Ok(resolved)
            }
            None => {
                crate::metrics::inc_provider_resolution_failure();
                tracing::warn!(
                    attempts = self.max_attempts,
                    candidates = ?self.candidate_names(),
                    "No wallet provider available"
                );
                Err(ProviderError::Unavailable {
                    attempts: self.max_attempts,
                })
            }
        }
    }
}
