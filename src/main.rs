use std::env;

use bigdecimal::BigDecimal;
use log::*;

use bank_core::{monthly_payment, Settings};

fn main() {
	if env::var("RUST_LOG").is_err() {
		env::set_var("RUST_LOG", "info");
	}
	pretty_env_logger::init();

	let settings = Settings::from_env();
	info!("transfer fee rate: {}", settings.transfer_fee_rate);
	info!("minimum deposit:   {}", settings.min_deposit);

	let principal = BigDecimal::from(10_000);
	let quote = monthly_payment(&principal, 0.05, 60);
	info!("sample quote: {} over 60 months at 5% costs {}/month", principal, quote);
}
