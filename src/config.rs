use std::env;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use dotenv::dotenv;

/// System-wide banking policy knobs.
///
/// The portal keeps these in an admin-managed settings store; the core never
/// reads them ambiently. Whoever constructs the service decides where the
/// values come from and hands them over as a plain value object.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
	/// Fee charged on outgoing transfers, as a fraction (0.005 == 0.5%)
	pub transfer_fee_rate: BigDecimal,
	/// Smallest amount accepted by a standalone deposit
	pub min_deposit: BigDecimal,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			transfer_fee_rate: BigDecimal::new(BigInt::from(5), 3),
			min_deposit: BigDecimal::from(10),
		}
	}
}

impl Settings {
	/// Load settings from the environment, falling back to the defaults.
	///
	/// Recognized variables: `TRANSFER_FEE_RATE`, `MIN_DEPOSIT`.
	/// Loads `.env` file in the environment's directory
	pub fn from_env() -> Self {
		dotenv().ok();
		let defaults = Settings::default();

		Settings {
			transfer_fee_rate: env_decimal("TRANSFER_FEE_RATE").unwrap_or(defaults.transfer_fee_rate),
			min_deposit: env_decimal("MIN_DEPOSIT").unwrap_or(defaults.min_deposit),
		}
	}

	/// Settings with no transfer fee and no deposit floor, for free-tier
	/// products and tests
	pub fn no_fees() -> Self {
		Settings {
			transfer_fee_rate: BigDecimal::from(0),
			min_deposit: BigDecimal::from(0),
		}
	}
}

fn env_decimal(key: &str) -> Option<BigDecimal> {
	env::var(key).ok().and_then(|v| BigDecimal::from_str(&v).ok())
}
