pub mod address_validator;
pub mod units;

// Re-export commonly used functions
pub use address_validator::{hex_address, short_address, AddressValidator};
pub use units::{format_units, gwei_to_wei, wei_to_native};
