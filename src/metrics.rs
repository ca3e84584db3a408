use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, OnceLock},
};

use crate::error::ErrorCategory;

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

#[derive(Default)]
struct MetricsState {
    registration_attempts: u64,
    registration_success: u64,
    // 按错误分类统计失败
    registration_failures: HashMap<&'static str, u64>,
    approval_writes: u64,
    provider_resolution_failures: u64,
    simulation_bypassed: u64,
    // 链切换结果：confirmed / switched / added / failed
    chain_guard_results: HashMap<&'static str, u64>,
    gas_price_fallbacks: u64,
    balance_read_failures: u64,
}

fn state() -> MutexGuard<'static, MetricsState> {
    let lock = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn inc_registration_attempt() {
    state().registration_attempts += 1;
}

pub fn inc_registration_success() {
    state().registration_success += 1;
}

pub fn inc_registration_failure(category: ErrorCategory) {
    *state()
        .registration_failures
        .entry(category.code())
        .or_insert(0) += 1;
}

pub fn inc_approval_write() {
    state().approval_writes += 1;
}

pub fn inc_provider_resolution_failure() {
    state().provider_resolution_failures += 1;
}

pub fn inc_simulation_bypassed() {
    state().simulation_bypassed += 1;
}

pub fn inc_chain_guard_result(result: &'static str) {
    *state().chain_guard_results.entry(result).or_insert(0) += 1;
}

pub fn inc_gas_price_fallback() {
    state().gas_price_fallbacks += 1;
}

pub fn inc_balance_read_failure() {
    state().balance_read_failures += 1;
}

pub fn registration_failures(category: ErrorCategory) -> u64 {
    state()
        .registration_failures
        .get(category.code())
        .copied()
        .unwrap_or(0)
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();

    out.push_str("# HELP nameforge_registration_attempts_total Registration attempts\n");
    out.push_str("# TYPE nameforge_registration_attempts_total counter\n");
    out.push_str(&format!(
        "nameforge_registration_attempts_total {}\n",
        s.registration_attempts
    ));

    out.push_str("# HELP nameforge_registration_success_total Confirmed registrations\n");
    out.push_str("# TYPE nameforge_registration_success_total counter\n");
    out.push_str(&format!(
        "nameforge_registration_success_total {}\n",
        s.registration_success
    ));

    out.push_str("# HELP nameforge_registration_failures_total Failed registrations per category\n");
    out.push_str("# TYPE nameforge_registration_failures_total counter\n");
    let mut failures: Vec<_> = s.registration_failures.iter().collect();
    failures.sort();
    for (k, v) in failures {
        out.push_str(&format!(
            "nameforge_registration_failures_total{{category=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP nameforge_approval_writes_total Token approval transactions sent\n");
    out.push_str("# TYPE nameforge_approval_writes_total counter\n");
    out.push_str(&format!(
        "nameforge_approval_writes_total {}\n",
        s.approval_writes
    ));

    out.push_str(
        "# HELP nameforge_provider_resolution_failures_total Wallet provider lookups that timed out\n",
    );
    out.push_str("# TYPE nameforge_provider_resolution_failures_total counter\n");
    out.push_str(&format!(
        "nameforge_provider_resolution_failures_total {}\n",
        s.provider_resolution_failures
    ));

    out.push_str(
        "# HELP nameforge_simulation_bypassed_total Preflight failures ignored before submission\n",
    );
    out.push_str("# TYPE nameforge_simulation_bypassed_total counter\n");
    out.push_str(&format!(
        "nameforge_simulation_bypassed_total {}\n",
        s.simulation_bypassed
    ));

    out.push_str("# HELP nameforge_chain_guard_results_total Chain guard outcomes\n");
    out.push_str("# TYPE nameforge_chain_guard_results_total counter\n");
    let mut guard_results: Vec<_> = s.chain_guard_results.iter().collect();
    guard_results.sort();
    for (k, v) in guard_results {
        out.push_str(&format!(
            "nameforge_chain_guard_results_total{{result=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP nameforge_gas_price_fallback_total Gas estimates that used the default price\n");
    out.push_str("# TYPE nameforge_gas_price_fallback_total counter\n");
    out.push_str(&format!(
        "nameforge_gas_price_fallback_total {}\n",
        s.gas_price_fallbacks
    ));

    out.push_str("# HELP nameforge_balance_read_failures_total Balance reads that failed open\n");
    out.push_str("# TYPE nameforge_balance_read_failures_total counter\n");
    out.push_str(&format!(
        "nameforge_balance_read_failures_total {}\n",
        s.balance_read_failures
    ));

    out
}
