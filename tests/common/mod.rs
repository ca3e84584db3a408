//! 测试辅助模块
//!
//! 内存中的钱包与链 RPC 替身，共享同一份账本，记录每一次调用，
//! 便于断言调用次数（零写入、零提交、零网络调用）。

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use ethers::{
    abi::{ParamType, Token},
    types::{Address, Bytes, U256},
};
use nameforge::{
    config::Config,
    infrastructure::{
        abi, chain_rpc::parse_quantity, wallet_provider::methods, CallRequest, ChainRpc,
        ProviderEvent, ProviderRpcError, RpcError, TransactionReceipt, WalletProvider,
    },
    service::{
        registry_client::{GET_DOMAIN_INFO, IS_AVAILABLE},
        ProviderResolver, ProviderSlot, ProviderSource, RegistrationSession,
    },
};
use serde_json::{json, Value};
use tokio::sync::broadcast;

pub const ALICE: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb6";
pub const CONTRACT: &str = "0x1111111111111111111111111111111111111111";
pub const TOKEN: &str = "0x2222222222222222222222222222222222222222";
pub const CELO: u64 = 42220;
pub const PRICE: u64 = 10_000_000_000_000_000;
pub const GAS_BUFFER: u64 = 100_000_000_000_000_000;

const REGISTER_SIGS: [&str; 2] = [
    "registerDomain(string,string,string)",
    "registerDomain(string,uint256,string,string)",
];

pub fn addr(s: &str) -> Address {
    s.parse().expect("test address")
}

/// 钱包与链共享的状态
pub struct Ledger {
    pub wallet_chain: u64,
    pub known_chains: HashSet<u64>,
    /// false 时 wallet_addEthereumChain 返回成功但钱包仍不认识该链
    pub add_chain_takes_effect: bool,
    pub native_balances: HashMap<Address, U256>,
    pub token_balances: HashMap<(Address, Address), U256>,
    pub allowances: HashMap<(Address, Address, Address), U256>,
    pub registered: HashSet<String>,
    /// 预检模拟强制返回的 revert（消息, 数据）
    pub simulation_revert: Option<(String, Option<String>)>,
    pub availability_fails: bool,
    pub gas_price: Option<U256>,
    pub register_receipt_status: u8,
    /// 为 false 时回执永不出现
    pub mine_receipts: bool,
    pub send_error: Option<ProviderRpcError>,
    pub receipts: HashMap<String, TransactionReceipt>,
    pub next_block: u64,
    pub wallet_calls: Vec<String>,
    pub rpc_calls: Vec<String>,
    pub sent: Vec<SentTx>,
}

#[derive(Debug, Clone)]
pub struct SentTx {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl SentTx {
    pub fn selector(&self) -> [u8; 4] {
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&self.data[..4]);
        sel
    }

    pub fn is_approve(&self) -> bool {
        self.selector() == abi::selector(abi::ERC20_APPROVE)
    }

    pub fn is_register(&self) -> bool {
        REGISTER_SIGS
            .iter()
            .any(|sig| self.selector() == abi::selector(sig))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            wallet_chain: CELO,
            known_chains: [1, CELO].into_iter().collect(),
            add_chain_takes_effect: true,
            native_balances: HashMap::new(),
            token_balances: HashMap::new(),
            allowances: HashMap::new(),
            registered: HashSet::new(),
            simulation_revert: None,
            availability_fails: false,
            gas_price: Some(U256::from(5_000_000_000u64)),
            register_receipt_status: 1,
            mine_receipts: true,
            send_error: None,
            receipts: HashMap::new(),
            next_block: 1_000,
            wallet_calls: Vec::new(),
            rpc_calls: Vec::new(),
            sent: Vec::new(),
        }
    }
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

pub fn ledger() -> SharedLedger {
    Arc::new(Mutex::new(Ledger::default()))
}

fn decode_name(data: &[u8]) -> Option<String> {
    match abi::decode_tokens(&[ParamType::String], data.get(4..)?).ok()?.first() {
        Some(Token::String(name)) => Some(name.clone()),
        _ => None,
    }
}

fn parse_chain_param(params: &Value) -> Option<u64> {
    let raw = params[0]["chainId"].as_str()?;
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok()
}

/// 内存钱包
pub struct MockWallet {
    pub ledger: SharedLedger,
    pub account: Address,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWallet {
    pub fn new(ledger: SharedLedger, account: Address) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            ledger,
            account,
            events,
        }
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn send_transaction(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        if let Some(err) = ledger.send_error.clone() {
            return Err(err);
        }

        let tx = &params[0];
        let to = addr(tx["to"].as_str().unwrap_or_default());
        let data = Bytes::from(
            hex::decode(tx["data"].as_str().unwrap_or("0x").trim_start_matches("0x"))
                .unwrap_or_default(),
        );
        let value = tx["value"]
            .as_str()
            .and_then(parse_quantity)
            .unwrap_or_default();
        let sent = SentTx { to, data, value };

        let mut status = 1;
        if sent.is_approve() {
            let tokens = abi::decode_tokens(&[ParamType::Address, ParamType::Uint(256)], &sent.data[4..])
                .unwrap_or_default();
            if let [Token::Address(spender), Token::Uint(amount)] = tokens.as_slice() {
                ledger.allowances.insert((to, self.account, *spender), *amount);
            }
        } else if sent.is_register() {
            status = ledger.register_receipt_status;
            if status == 1 {
                if let Some(name) = decode_name(&sent.data) {
                    ledger.registered.insert(name);
                }
            }
        }

        let hash = format!("0x{:064x}", ledger.sent.len() + 1);
        ledger.sent.push(sent);
        if ledger.mine_receipts {
            ledger.next_block += 1;
            let receipt = TransactionReceipt {
                tx_hash: hash.clone(),
                block_number: Some(ledger.next_block),
                block_hash: None,
                gas_used: Some(100_000),
                effective_gas_price: None,
                status: Some(status),
            };
            ledger.receipts.insert(hash.clone(), receipt);
        }
        Ok(Value::String(hash))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        self.ledger.lock().unwrap().wallet_calls.push(method.to_string());

        match method {
            methods::REQUEST_ACCOUNTS | methods::ACCOUNTS => {
                Ok(json!([format!("{:?}", self.account)]))
            }
            methods::CHAIN_ID => Ok(json!(format!(
                "0x{:x}",
                self.ledger.lock().unwrap().wallet_chain
            ))),
            methods::SWITCH_CHAIN => {
                let requested = parse_chain_param(&params)
                    .ok_or_else(|| ProviderRpcError::new(-32602, "invalid chainId"))?;
                let mut ledger = self.ledger.lock().unwrap();
                if !ledger.known_chains.contains(&requested) {
                    return Err(ProviderRpcError::new(
                        ProviderRpcError::UNRECOGNIZED_CHAIN,
                        format!("Unrecognized chain ID \"0x{:x}\"", requested),
                    ));
                }
                ledger.wallet_chain = requested;
                drop(ledger);
                self.emit(ProviderEvent::ChainChanged(format!("0x{:x}", requested)));
                Ok(Value::Null)
            }
            methods::ADD_CHAIN => {
                let added = parse_chain_param(&params)
                    .ok_or_else(|| ProviderRpcError::new(-32602, "invalid chainId"))?;
                let mut ledger = self.ledger.lock().unwrap();
                if ledger.add_chain_takes_effect {
                    ledger.known_chains.insert(added);
                }
                Ok(Value::Null)
            }
            methods::SEND_TRANSACTION => self.send_transaction(&params),
            methods::REVOKE_PERMISSIONS => Ok(Value::Null),
            other => Err(ProviderRpcError::new(
                ProviderRpcError::UNSUPPORTED_METHOD,
                format!("unsupported method {}", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// 内存链 RPC
pub struct MockChain {
    pub ledger: SharedLedger,
}

impl MockChain {
    fn record(&self, call: impl Into<String>) {
        self.ledger.lock().unwrap().rpc_calls.push(call.into());
    }
}

fn revert(message: &str, data: Option<String>) -> RpcError {
    RpcError::Rpc {
        code: 3,
        message: message.to_string(),
        data,
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.record("eth_gasPrice");
        self.ledger
            .lock()
            .unwrap()
            .gas_price
            .ok_or_else(|| RpcError::Transport("connection refused".into()))
    }

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.record("eth_getBalance");
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .native_balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError> {
        let sel = &request.data[..4];
        let payload = &request.data[4..];
        let ledger = self.ledger.lock().unwrap();

        if sel == abi::selector(abi::ERC20_BALANCE_OF) {
            drop(ledger);
            self.record("balanceOf");
            let owner = match abi::decode_tokens(&[ParamType::Address], payload)
                .map_err(|e| RpcError::Malformed(e.to_string()))?
                .as_slice()
            {
                [Token::Address(owner)] => *owner,
                _ => return Err(RpcError::Malformed("balanceOf args".into())),
            };
            let ledger = self.ledger.lock().unwrap();
            let balance = ledger
                .token_balances
                .get(&(request.to, owner))
                .copied()
                .unwrap_or_default();
            return Ok(Bytes::from(ethers::abi::encode(&[Token::Uint(balance)])));
        }

        if sel == abi::selector(abi::ERC20_ALLOWANCE) {
            drop(ledger);
            self.record("allowance");
            let (owner, spender) = match abi::decode_tokens(&[ParamType::Address, ParamType::Address], payload)
                .map_err(|e| RpcError::Malformed(e.to_string()))?
                .as_slice()
            {
                [Token::Address(o), Token::Address(s)] => (*o, *s),
                _ => return Err(RpcError::Malformed("allowance args".into())),
            };
            let ledger = self.ledger.lock().unwrap();
            let allowance = ledger
                .allowances
                .get(&(request.to, owner, spender))
                .copied()
                .unwrap_or_default();
            return Ok(Bytes::from(ethers::abi::encode(&[Token::Uint(allowance)])));
        }

        if sel == abi::selector(IS_AVAILABLE) {
            let failing = ledger.availability_fails;
            let available = decode_name(&request.data)
                .map(|name| !ledger.registered.contains(&name))
                .unwrap_or(false);
            drop(ledger);
            self.record("isAvailable");
            if failing {
                return Err(revert("execution reverted: function not found", None));
            }
            return Ok(Bytes::from(ethers::abi::encode(&[Token::Bool(available)])));
        }

        if sel == abi::selector(GET_DOMAIN_INFO) {
            drop(ledger);
            self.record("getDomainInfo");
            return Ok(Bytes::from(ethers::abi::encode(&[
                Token::Address(Address::zero()),
                Token::Uint(U256::zero()),
                Token::Uint(U256::zero()),
                Token::String(String::new()),
                Token::String(String::new()),
            ])));
        }

        if REGISTER_SIGS.iter().any(|sig| sel == abi::selector(sig)) {
            let forced = ledger.simulation_revert.clone();
            let taken = decode_name(&request.data)
                .map(|name| ledger.registered.contains(&name))
                .unwrap_or(false);
            drop(ledger);
            self.record("simulateRegister");
            if let Some((message, data)) = forced {
                return Err(revert(&message, data));
            }
            if taken {
                let data = format!("0x{}", hex::encode(abi::selector("DomainNotAvailable()")));
                return Err(revert("execution reverted", Some(data)));
            }
            return Ok(Bytes::default());
        }

        Err(RpcError::Malformed(format!("unknown selector 0x{}", hex::encode(sel))))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        self.record("eth_getTransactionReceipt");
        Ok(self.ledger.lock().unwrap().receipts.get(tx_hash).cloned())
    }
}

/// 测试用配置：快速轮询、原生币或代币支付
pub fn test_config(fee_token: Option<&str>) -> Config {
    let mut config = Config::default();
    config.registrar.contract_address = CONTRACT.to_string();
    config.registrar.fee_token_address = fee_token.map(str::to_string);
    config.registrar.price_wei = PRICE;
    config.registrar.native_gas_buffer_wei = GAS_BUFFER;
    config.registrar.name_suffix = "farcaster.celo".to_string();
    config.registrar.abi_variant = Default::default();
    config.registrar.gas_units = 120_000;
    config.registrar.default_gas_price_gwei = 1;
    config.registrar.native_usd_rate = 2.0;
    config.network.chain_id = CELO;
    config.network.rpc_url = "https://forno.celo.org".to_string();
    config.network.explorer_url = "https://explorer.celo.org".to_string();
    config.network.provider_poll_interval_ms = 1;
    config.network.provider_poll_max_attempts = 3;
    config.network.receipt_poll_interval_ms = 1;
    config.network.confirmation_timeout_secs = Some(5);
    config.logging.level = "info".to_string();
    config.logging.format = "text".to_string();
    config
}

pub struct Harness {
    pub ledger: SharedLedger,
    pub wallet: Arc<MockWallet>,
    pub session: RegistrationSession,
}

impl Harness {
    pub fn native() -> Self {
        Self::build(test_config(None), true)
    }

    pub fn token() -> Self {
        Self::build(test_config(Some(TOKEN)), true)
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, true)
    }

    /// 没有任何钱包 Provider 可用
    pub fn without_provider() -> Self {
        Self::build(test_config(None), false)
    }

    fn build(config: Config, with_provider: bool) -> Self {
        let ledger = ledger();
        let wallet = Arc::new(MockWallet::new(ledger.clone(), addr(ALICE)));
        let rpc: Arc<dyn ChainRpc> = Arc::new(MockChain {
            ledger: ledger.clone(),
        });

        let slot: Arc<dyn ProviderSource> = if with_provider {
            Arc::new(ProviderSlot::with_provider("injected", wallet.clone()))
        } else {
            Arc::new(ProviderSlot::new("injected"))
        };
        let resolver = ProviderResolver::new(vec![slot]).with_polling(Duration::from_millis(1), 3);

        let session = RegistrationSession::new(config, rpc, resolver).expect("valid test config");
        Self {
            ledger,
            wallet,
            session,
        }
    }

    pub fn set_native_balance(&self, wei: U256) {
        self.ledger
            .lock()
            .unwrap()
            .native_balances
            .insert(addr(ALICE), wei);
    }

    pub fn set_token_balance(&self, amount: U256) {
        self.ledger
            .lock()
            .unwrap()
            .token_balances
            .insert((addr(TOKEN), addr(ALICE)), amount);
    }

    pub fn set_allowance(&self, amount: U256) {
        self.ledger
            .lock()
            .unwrap()
            .allowances
            .insert((addr(TOKEN), addr(ALICE), addr(CONTRACT)), amount);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.ledger.lock().unwrap().sent.clone()
    }

    pub fn wallet_calls(&self) -> Vec<String> {
        self.ledger.lock().unwrap().wallet_calls.clone()
    }

    pub fn rpc_calls(&self) -> Vec<String> {
        self.ledger.lock().unwrap().rpc_calls.clone()
    }
}
