//! 注册会话
//!
//! 显式的上下文对象：持有配置、链读取端、Provider 解析器以及各阶段服务，
//! 缓存首次解析成功的 Provider（失败不缓存）。构造一次，整个会话内复用，
//! 所有方法都可以安全重复调用。
//!
//! 流水线：Provider → 链守卫 → (gas 预估, 余额检查) → 授权（仅代币）→ 执行器。
//! 任何阶段失败都会短路后续阶段。

use std::sync::Arc;

use anyhow::Result;
use ethers::types::Address;
use tokio::sync::OnceCell;

use crate::{
    config::Config,
    domain::{
        registration::label_problem, NetworkDefinition, PaymentMode, PipelineStage,
        RegistrationParams, TransactionOutcome, WalletAccount,
    },
    error::{ErrorCategory, StageFailure},
    infrastructure::{ChainRpc, JsonRpcChainClient, WalletSigner},
    service::{
        approval_coordinator::ApprovalCoordinator,
        balance_verifier::{BalanceCheck, BalanceVerifier},
        chain_guard::ChainGuard,
        gas_estimator::{GasEstimate, GasEstimator},
        provider_resolver::{ProviderError, ProviderResolver, ProviderSource, ResolvedProvider},
        receipt_waiter::ReceiptWaiter,
        registration_executor::{outcome_from_failure, RegistrationExecutor},
        registry_client::{DomainInfo, RegistryClient},
        wallet_connector,
    },
    utils::short_address,
};

pub struct RegistrationSession {
    config: Config,
    network: NetworkDefinition,
    payment_mode: PaymentMode,
    resolver: ProviderResolver,
    provider: OnceCell<ResolvedProvider>,
    chain_guard: ChainGuard,
    gas_estimator: GasEstimator,
    balance_verifier: BalanceVerifier,
    approval: ApprovalCoordinator,
    registry: RegistryClient,
    executor: RegistrationExecutor,
}

impl RegistrationSession {
    pub fn new(config: Config, rpc: Arc<dyn ChainRpc>, resolver: ProviderResolver) -> Result<Self> {
        config.validate()?;

        let contract = config.contract_address()?;
        let payment_mode = config.payment_mode()?;
        let network = config.network_definition();

        let receipt_waiter = ReceiptWaiter::new(rpc.clone(), config.receipt_poll_interval())
            .with_timeout(config.confirmation_timeout());
        let registry = RegistryClient::new(rpc.clone(), contract, config.registrar.abi_variant);
        let executor = RegistrationExecutor::new(
            registry.clone(),
            receipt_waiter.clone(),
            network.clone(),
            config.registrar.name_suffix.clone(),
            config.price(),
        );

        tracing::info!(
            chain_id = network.chain_id,
            contract = %short_address(&contract),
            payment_mode = %payment_mode,
            abi_variant = %config.registrar.abi_variant,
            "Registration session initialized"
        );

        Ok(Self {
            gas_estimator: GasEstimator::from_config(rpc.clone(), &config),
            balance_verifier: BalanceVerifier::new(rpc.clone(), config.native_gas_buffer()),
            approval: ApprovalCoordinator::new(rpc, receipt_waiter),
            chain_guard: ChainGuard::new(network.clone()),
            provider: OnceCell::new(),
            config,
            network,
            payment_mode,
            resolver,
            registry,
            executor,
        })
    }

    /// 使用配置中的 RPC 地址与轮询参数构造
    pub fn from_config(config: Config, sources: Vec<Arc<dyn ProviderSource>>) -> Result<Self> {
        let rpc: Arc<dyn ChainRpc> = Arc::new(JsonRpcChainClient::new(
            config.network.rpc_url.clone(),
            config.rpc_timeout(),
        ));
        let resolver = ProviderResolver::new(sources).with_polling(
            config.provider_poll_interval(),
            config.network.provider_poll_max_attempts,
        );
        Self::new(config, rpc, resolver)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> &NetworkDefinition {
        &self.network
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn contract(&self) -> Address {
        self.registry.contract()
    }

    /// 解析钱包 Provider；成功后缓存
    pub async fn provider(&self) -> Result<ResolvedProvider, ProviderError> {
        self.provider
            .get_or_try_init(|| self.resolver.resolve())
            .await
            .cloned()
    }

    pub async fn connect_wallet(&self) -> Result<WalletAccount, ProviderError> {
        let resolved = self.provider().await?;
        wallet_connector::connect(resolved.provider.as_ref()).await
    }

    pub async fn disconnect_wallet(&self) {
        if let Some(resolved) = self.provider.get() {
            wallet_connector::disconnect(resolved.provider.as_ref()).await;
        }
    }

    pub async fn estimate_cost(&self) -> GasEstimate {
        self.gas_estimator.estimate().await
    }

    pub async fn check_balance(&self, account: &WalletAccount) -> BalanceCheck {
        self.balance_verifier
            .check_sufficient(account.address, &self.payment_mode, self.config.price())
            .await
    }

    /// 只读可用性查询，不需要钱包
    pub async fn check_availability(&self, label: &str) -> Result<bool, StageFailure> {
        let full_name = self.full_name_for(label)?;
        self.registry
            .is_available(&full_name)
            .await
            .map_err(|e| StageFailure::new(PipelineStage::Availability, ErrorCategory::Unknown, e.to_string()))
    }

    pub async fn domain_info(&self, label: &str) -> Result<DomainInfo, StageFailure> {
        let full_name = self.full_name_for(label)?;
        self.registry
            .domain_info(&full_name)
            .await
            .map_err(|e| StageFailure::new(PipelineStage::Availability, ErrorCategory::Unknown, e.to_string()))
    }

    fn full_name_for(&self, label: &str) -> Result<String, StageFailure> {
        if let Some(problem) = label_problem(label) {
            return Err(StageFailure::validation(problem));
        }
        Ok(crate::domain::full_name(label, &self.config.registrar.name_suffix))
    }

    /// 执行完整注册流水线；不会返回 `Err`
    pub async fn register(
        &self,
        params: &RegistrationParams,
        account: &WalletAccount,
    ) -> TransactionOutcome {
        crate::metrics::inc_registration_attempt();
        tracing::info!(
            label = %params.label,
            account = %short_address(&account.address),
            mode = %self.payment_mode,
            "Registration started"
        );

        let full_name = params.full_name(&self.config.registrar.name_suffix);
        let outcome = match self.run_pipeline(params, account).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                let outcome =
                    outcome_from_failure(failure, &self.executor.message_context(&full_name));
                if params.validate().is_ok() {
                    outcome.with_full_name(full_name)
                } else {
                    outcome
                }
            }
        };

        match outcome.error_category {
            None if outcome.success => crate::metrics::inc_registration_success(),
            Some(category) => crate::metrics::inc_registration_failure(category),
            None => crate::metrics::inc_registration_failure(ErrorCategory::Unknown),
        }

        tracing::info!(
            label = %params.label,
            success = outcome.success,
            category = ?outcome.error_category,
            stage = ?outcome.stage,
            tx_hash = ?outcome.tx_hash,
            "Registration finished"
        );
        outcome
    }

    async fn run_pipeline(
        &self,
        params: &RegistrationParams,
        account: &WalletAccount,
    ) -> Result<TransactionOutcome, StageFailure> {
        // 本地校验失败时不做任何网络调用
        params
            .validate()
            .map_err(|e| StageFailure::validation(e.problems.join(", ")))?;
        self.registry
            .check_params(params)
            .map_err(|e| StageFailure::validation(e.to_string()))?;
        if !account.connected {
            return Err(StageFailure::validation("Wallet is not connected"));
        }

        let resolved = self.provider().await.map_err(|e| {
            StageFailure::new(
                PipelineStage::Provider,
                ErrorCategory::ProviderUnavailable,
                e.to_string(),
            )
        })?;

        let confirmation = self
            .chain_guard
            .ensure_chain(resolved.provider.as_ref(), account.address)
            .await
            .map_err(|e| {
                StageFailure::new(
                    PipelineStage::ChainCheck,
                    ErrorCategory::ChainMismatch,
                    e.to_string(),
                )
            })?;

        let price = self.config.price();
        let (estimate, balance) = tokio::join!(
            self.gas_estimator.estimate(),
            self.balance_verifier
                .check_sufficient(account.address, &self.payment_mode, price)
        );
        tracing::debug!(
            total_cost_native = %estimate.total_cost_native,
            used_default_price = estimate.used_default_price,
            "Gas estimated"
        );

        if !balance.sufficient {
            let category = match self.payment_mode {
                PaymentMode::NativeCurrency => ErrorCategory::InsufficientFunds,
                PaymentMode::FungibleToken(_) => ErrorCategory::InsufficientBalance,
            };
            return Err(StageFailure::new(
                PipelineStage::Balance,
                category,
                format!(
                    "balance {} below required {}",
                    balance.balance.unwrap_or_default(),
                    balance.required
                ),
            ));
        }

        let signer = WalletSigner::new(resolved.provider.clone(), account.address);

        let approval_tx_hash = match self.payment_mode {
            PaymentMode::NativeCurrency => None,
            PaymentMode::FungibleToken(token) => {
                let state = self
                    .approval
                    .ensure_approval(&signer, token, self.registry.contract(), price)
                    .await
                    .map_err(|e| {
                        let failure = StageFailure::new(
                            PipelineStage::Approval,
                            ErrorCategory::ApprovalFailed,
                            e.message.clone(),
                        );
                        match e.tx_hash {
                            Some(hash) => failure.with_tx_hash(hash),
                            None => failure,
                        }
                    })?;
                state.approval_tx_hash
            }
        };

        let outcome = self
            .executor
            .execute(params, &self.payment_mode, &signer, &confirmation)
            .await;
        Ok(outcome.with_approval_tx_hash(approval_tx_hash))
    }
}
