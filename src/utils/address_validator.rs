//! 地址验证模块
//!
//! 统一的 EVM 地址验证逻辑（Celo 与以太坊地址格式一致）

use std::str::FromStr;

use ethers::types::Address;

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证EVM地址（支持EIP-55 Checksum）
    ///
    /// 全小写或全大写地址不做 checksum 校验；混合大小写必须满足 EIP-55。
    pub fn validate_evm_address(address: &str) -> bool {
        // 1. 基本格式检查
        if !address.starts_with("0x") {
            return false;
        }

        if address.len() != 42 {
            return false;
        }

        // 2. 验证hex字符
        let hex_part = &address[2..];
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 3. EIP-55 Checksum验证（仅混合大小写时）
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Self::verify_eip55_checksum(address);
        }

        true
    }

    /// 验证并解析为 `Address`
    pub fn parse_evm_address(address: &str) -> Option<Address> {
        if !Self::validate_evm_address(address) {
            return None;
        }
        Address::from_str(address).ok()
    }

    /// 验证EIP-55 Checksum
    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(address: &str) -> bool {
        use sha3::{Digest, Keccak256};

        let addr_lower = address[2..].to_lowercase();
        let mut hasher = Keccak256::new();
        hasher.update(addr_lower.as_bytes());
        let hash = hasher.finalize();

        let hex_chars = &address[2..];
        for (i, ch) in hex_chars.chars().enumerate() {
            if ch.is_alphabetic() {
                let hash_byte = hash[i / 2];
                let hash_nibble = if i % 2 == 0 {
                    hash_byte >> 4
                } else {
                    hash_byte & 0x0f
                };

                let should_be_uppercase = hash_nibble >= 8;
                if ch.is_uppercase() != should_be_uppercase {
                    return false;
                }
            }
        }

        true
    }
}

/// 完整 0x 十六进制地址（`Address` 的 Display 会截断）
pub fn hex_address(address: &Address) -> String {
    format!("{:?}", address)
}

/// 日志用短地址：0x1234…abcd
pub fn short_address(address: &Address) -> String {
    let full = hex_address(address);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_address_validation() {
        // 有效地址（全小写 - 无checksum，总是通过）
        assert!(AddressValidator::validate_evm_address(
            "0x742d35cc6634c0532925a3b844bc9e7595f0beb6"
        ));

        // EIP-55 示例地址
        assert!(AddressValidator::validate_evm_address(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));

        // 无效地址
        assert!(!AddressValidator::validate_evm_address("0x123"));
        assert!(!AddressValidator::validate_evm_address(
            "742d35Cc6634C0532925a3b844Bc9e7595f0bEb6"
        ));
        assert!(!AddressValidator::validate_evm_address(
            "0xGGGG35Cc6634C0532925a3b844Bc9e7595f0bEb6"
        ));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        // 首字母大小写被篡改
        assert!(!AddressValidator::validate_evm_address(
            "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
    }

    #[test]
    fn test_parse_and_format() {
        let addr =
            AddressValidator::parse_evm_address("0x742d35cc6634c0532925a3b844bc9e7595f0beb6")
                .unwrap();
        assert_eq!(
            hex_address(&addr),
            "0x742d35cc6634c0532925a3b844bc9e7595f0beb6"
        );
        assert_eq!(short_address(&addr), "0x742d…beb6");
        assert!(AddressValidator::parse_evm_address("not-an-address").is_none());
    }
}
