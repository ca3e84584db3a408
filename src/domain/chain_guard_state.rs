//! 链守卫状态定义
//! 钱包当前网络与目标链的对齐过程，统一使用该状态机

use std::fmt;

use serde::{Deserialize, Serialize};

/// 链守卫状态机
///
/// `Unknown → Checking → {Confirmed | Switching → {Confirmed | Adding → {Confirmed | Failed} | Failed}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainGuardState {
    /// 尚未检查
    Unknown,

    /// 正在读取钱包当前链 ID
    Checking,

    /// 已请求钱包切换网络
    Switching,

    /// 钱包不认识目标链，正在注册网络元数据
    Adding,

    /// 当前链与目标链一致
    Confirmed,

    /// 切换失败（用户拒绝、钱包错误或注册后仍无法切换）
    Failed,
}

impl ChainGuardState {
    /// 是否为终态（一次 ensure_chain 调用必须停在终态）
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// 验证状态转换合法性
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use ChainGuardState::*;

        match (self, target) {
            // Unknown → Checking
            (Unknown, Checking) => true,

            // Checking → Confirmed | Switching | Failed
            (Checking, Confirmed) | (Checking, Switching) | (Checking, Failed) => true,

            // Switching → Confirmed | Adding | Failed
            (Switching, Confirmed) | (Switching, Adding) | (Switching, Failed) => true,

            // Adding → Confirmed | Failed（注册后只重试一次切换）
            (Adding, Confirmed) | (Adding, Failed) => true,

            // 终态可重新检查（ensure_chain 可重复调用）
            (Confirmed, Checking) | (Failed, Checking) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Checking => "checking",
            Self::Switching => "switching",
            Self::Adding => "adding",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl Default for ChainGuardState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ChainGuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
