//! Nameforge 命令行入口
//!
//! 只读：打印当前 gas 预估，并查询命令行给出的标签是否可注册。
//! 只使用链 RPC，不需要连接钱包。
//!
//! 用法：`nameforge [label]`

use anyhow::{Context, Result};
use nameforge::{
    config::Config, infrastructure::logging, service::RegistrationSession, utils::format_units,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（NAMEFORGE_CONFIG_PATH 指向的 TOML 优先）
    let config_path = std::env::var("NAMEFORGE_CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())
        .context("Failed to load configuration")?;

    // 3. 初始化日志；guard 需持有到进程结束
    let _log_guard = logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        chain_id = config.network.chain_id,
        rpc_url = %config.network.rpc_url,
        "🚀 Starting nameforge"
    );

    // 4. 只读会话：没有钱包 Provider 候选
    let session =
        RegistrationSession::from_config(config, Vec::new()).context("Invalid configuration")?;
    let currency = session.network().native_currency.clone();

    let estimate = session.estimate_cost().await;
    println!(
        "Estimated gas: {} units @ {} wei = {} (~${}){}",
        estimate.gas_units,
        estimate.gas_price_wei,
        format_units(estimate.total_cost_wei, currency.decimals, &currency.symbol),
        estimate.total_cost_fiat_approx.round_dp(4),
        if estimate.used_default_price {
            " [default gas price]"
        } else {
            ""
        }
    );
    println!(
        "Registration price: {}",
        format_units(session.config().price(), currency.decimals, &currency.symbol)
    );

    if let Some(label) = std::env::args().nth(1) {
        let full_name =
            nameforge::domain::full_name(&label, &session.config().registrar.name_suffix);
        match session.check_availability(&label).await {
            Ok(true) => println!("{} is available", full_name),
            Ok(false) => println!("{} is already registered", full_name),
            Err(failure) => {
                tracing::error!(label = %label, error = %failure, "Availability check failed");
                println!("Could not check {}: {}", full_name, failure.message);
            }
        }
    }

    Ok(())
}
