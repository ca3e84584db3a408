//! 钱包连接
//!
//! 连接：请求账户后读取链 ID，得到 `WalletAccount` 快照。
//! 断开：尽力撤销授权，从不失败。
//! 监听：把 Provider 的账户/链/断开事件映射为 `watch` 通道上的账户快照（None 表示已断开）。

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
};

use crate::{
    domain::WalletAccount,
    infrastructure::{
        wallet_provider::{current_chain_id, methods, parse_chain_id},
        ProviderEvent, WalletProvider,
    },
    service::provider_resolver::ProviderError,
    utils::{short_address, AddressValidator},
};

/// 连接钱包并返回首个账户
pub async fn connect(provider: &dyn WalletProvider) -> Result<WalletAccount, ProviderError> {
    let accounts = provider
        .request(methods::REQUEST_ACCOUNTS, json!([]))
        .await?;

    let first = accounts
        .as_array()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .ok_or(ProviderError::NoAccounts)?;

    let address = AddressValidator::parse_evm_address(first)
        .ok_or_else(|| ProviderError::InvalidAccount(first.to_string()))?;

    let chain_id = current_chain_id(provider).await?;

    tracing::info!(
        account = %short_address(&address),
        chain_id,
        "Wallet connected"
    );
    Ok(WalletAccount::connected(address, chain_id))
}

/// 撤销账户授权；钱包不支持或拒绝时只记录日志
pub async fn disconnect(provider: &dyn WalletProvider) {
    match provider
        .request(methods::REVOKE_PERMISSIONS, json!([{ "eth_accounts": {} }]))
        .await
    {
        Ok(_) => tracing::info!("Wallet permissions revoked"),
        Err(e) => tracing::debug!(error = %e, "Wallet permission revoke not honored"),
    }
}

/// 根据单个事件推导新的账户快照
pub fn apply_event(current: Option<WalletAccount>, event: &ProviderEvent) -> Option<WalletAccount> {
    match event {
        ProviderEvent::AccountsChanged(accounts) => {
            let address = accounts
                .first()
                .and_then(|a| AddressValidator::parse_evm_address(a))?;
            let chain_id = current.map(|a| a.chain_id).unwrap_or_default();
            Some(WalletAccount::connected(address, chain_id))
        }
        ProviderEvent::ChainChanged(chain) => {
            match parse_chain_id(&Value::String(chain.clone())) {
                Some(chain_id) => current.map(|a| a.with_chain_id(chain_id)),
                None => current,
            }
        }
        ProviderEvent::Disconnect => None,
    }
}

/// 后台监听 Provider 事件
///
/// 所有接收端被丢弃或事件源关闭时任务退出。
pub fn watch_account(
    provider: Arc<dyn WalletProvider>,
    initial: Option<WalletAccount>,
) -> (watch::Receiver<Option<WalletAccount>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(initial);
    let mut events = provider.subscribe();

    let handle = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Provider event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let next = apply_event(*tx.borrow(), &event);
            tracing::debug!(event = ?event, connected = next.is_some(), "Wallet account updated");
            if tx.send(next).is_err() {
                break;
            }
        }
    });

    (rx, handle)
}
