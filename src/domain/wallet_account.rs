//! 钱包账户快照（由钱包层提供，连接/账户切换时更新，断开时销毁）

use ethers::types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: Address,
    pub chain_id: u64,
    pub connected: bool,
}

impl WalletAccount {
    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            connected: true,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }
}
