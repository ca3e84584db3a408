//! 链守卫
//!
//! 确保钱包当前网络等于目标链：一致则确认；否则请求切换；
//! 钱包不认识目标链时先注册网络元数据，再重试切换且只重试一次。
//! 每次调用都停在 Confirmed 或 Failed，可安全重复调用。

use chrono::{DateTime, Utc};
use ethers::types::Address;

use crate::{
    domain::{ChainGuardState, NetworkDefinition},
    infrastructure::{
        wallet_provider::{current_chain_id, methods},
        ProviderRpcError, WalletProvider,
    },
    utils::short_address,
};

/// 链对齐失败
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Wallet is not on chain {target_chain_id} ({reason})")]
pub struct ChainMismatchError {
    pub target_chain_id: u64,
    pub current_chain_id: Option<u64>,
    pub reason: String,
    /// 经历的状态序列，最后一个必为 Failed
    pub transitions: Vec<ChainGuardState>,
}

/// 链已确认的凭证
///
/// 只能由 `ChainGuard` 构造，提交交易前必须持有。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfirmation {
    chain_id: u64,
    account: Address,
    confirmed_at: DateTime<Utc>,
    transitions: Vec<ChainGuardState>,
}

impl ChainConfirmation {
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn confirmed_at(&self) -> DateTime<Utc> {
        self.confirmed_at
    }

    pub fn transitions(&self) -> &[ChainGuardState] {
        &self.transitions
    }

    /// 是否经过了切换（而不是一开始就在目标链上）
    pub fn switched(&self) -> bool {
        self.transitions.contains(&ChainGuardState::Switching)
    }
}

/// 单次 ensure_chain 的状态推进记录
struct GuardRun {
    state: ChainGuardState,
    transitions: Vec<ChainGuardState>,
}

impl GuardRun {
    fn new() -> Self {
        Self {
            state: ChainGuardState::Unknown,
            transitions: vec![ChainGuardState::Unknown],
        }
    }

    fn advance(&mut self, next: ChainGuardState) {
        if !self.state.can_transition_to(&next) {
            tracing::error!(from = %self.state, to = %next, "Invalid chain guard transition");
        }
        self.state = next;
        self.transitions.push(next);
    }
}

pub struct ChainGuard {
    target: NetworkDefinition,
}

impl ChainGuard {
    pub fn new(target: NetworkDefinition) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &NetworkDefinition {
        &self.target
    }

    pub async fn ensure_chain(
        &self,
        provider: &dyn WalletProvider,
        account: Address,
    ) -> Result<ChainConfirmation, ChainMismatchError> {
        let target_id = self.target.chain_id;
        let mut run = GuardRun::new();

        // 1. Checking
        run.advance(ChainGuardState::Checking);
        let current = match current_chain_id(provider).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(run, None, format!("failed to read chain id: {}", e))),
        };

        // 2. 已在目标链
        if current == target_id {
            crate::metrics::inc_chain_guard_result("confirmed");
            return Ok(self.confirm(run, account));
        }

        tracing::info!(
            current_chain_id = current,
            target_chain_id = target_id,
            account = %short_address(&account),
            "Wallet on wrong chain, requesting switch"
        );

        // 3. Switching
        run.advance(ChainGuardState::Switching);
        match self.request_switch(provider).await {
            Ok(()) => {
                return self
                    .verify_after_switch(provider, run, account, current, "switched")
                    .await;
            }
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(
                    target_chain_id = target_id,
                    error = %e,
                    "Wallet does not know target chain, adding network"
                );
            }
            Err(e) => {
                return Err(self.fail(run, Some(current), format!("switch rejected: {}", e)));
            }
        }

        // 4. Adding：注册网络后只重试一次切换
        run.advance(ChainGuardState::Adding);
        if let Err(e) = provider
            .request(methods::ADD_CHAIN, self.target.add_chain_params())
            .await
        {
            return Err(self.fail(run, Some(current), format!("add network failed: {}", e)));
        }

        match self.request_switch(provider).await {
            Ok(()) => {
                self.verify_after_switch(provider, run, account, current, "added")
                    .await
            }
            Err(e) => Err(self.fail(
                run,
                Some(current),
                format!("switch after adding network failed: {}", e),
            )),
        }
    }

    async fn request_switch(&self, provider: &dyn WalletProvider) -> Result<(), ProviderRpcError> {
        provider
            .request(methods::SWITCH_CHAIN, self.target.switch_chain_params())
            .await
            .map(|_| ())
    }

    /// 切换请求成功后重新读取链 ID，确认钱包确实已在目标链
    async fn verify_after_switch(
        &self,
        provider: &dyn WalletProvider,
        run: GuardRun,
        account: Address,
        previous: u64,
        result: &'static str,
    ) -> Result<ChainConfirmation, ChainMismatchError> {
        match current_chain_id(provider).await {
            Ok(id) if id == self.target.chain_id => {
                crate::metrics::inc_chain_guard_result(result);
                Ok(self.confirm(run, account))
            }
            Ok(id) => Err(self.fail(
                run,
                Some(id),
                format!("wallet still on chain {} after switch", id),
            )),
            Err(e) => Err(self.fail(
                run,
                Some(previous),
                format!("failed to read chain id after switch: {}", e),
            )),
        }
    }

    fn confirm(&self, mut run: GuardRun, account: Address) -> ChainConfirmation {
        run.advance(ChainGuardState::Confirmed);
        ChainConfirmation {
            chain_id: self.target.chain_id,
            account,
            confirmed_at: Utc::now(),
            transitions: run.transitions,
        }
    }

    fn fail(&self, mut run: GuardRun, current: Option<u64>, reason: String) -> ChainMismatchError {
        run.advance(ChainGuardState::Failed);
        crate::metrics::inc_chain_guard_result("failed");
        tracing::warn!(
            target_chain_id = self.target.chain_id,
            current_chain_id = ?current,
            reason = %reason,
            "Chain guard failed"
        );
        ChainMismatchError {
            target_chain_id: self.target.chain_id,
            current_chain_id: current,
            reason,
            transitions: run.transitions,
        }
    }
}
