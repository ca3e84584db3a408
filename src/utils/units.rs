//! 金额单位换算
//! wei ↔ 原生币（18 位小数）的展示换算，全部使用 Decimal 避免浮点误差

use ethers::types::U256;
use rust_decimal::Decimal;

/// 1 gwei = 10^9 wei
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// gwei → wei
pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// wei → 原生币数量
///
/// 超出 Decimal 表示范围（约 7.9e28 最小单位）时返回 None
pub fn wei_to_native(wei: U256, decimals: u8) -> Option<Decimal> {
    if wei > U256::from(u128::MAX) {
        return None;
    }
    let raw = i128::try_from(wei.as_u128()).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals as u32)
        .ok()
        .map(|d| d.normalize())
}

/// 格式化为 "0.01 CELO" 形式；超出范围时退回原始 wei
pub fn format_units(wei: U256, decimals: u8, symbol: &str) -> String {
    match wei_to_native(wei, decimals) {
        Some(amount) => format!("{} {}", amount, symbol),
        None => format!("{} wei", wei),
    }
}
