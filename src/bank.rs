pub mod error;
pub mod service;

use bigdecimal::BigDecimal;

use crate::types::Id;
use crate::user::Role;

/// Identity of the authenticated caller, supplied by the authorization
/// layer. The core carries it for attribution but never authenticates.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
	pub user_id: Id,
	pub role: Role,
}

pub struct OpenAccountRequest {
	pub user_id: Id,
	pub type_id: Id,
	pub initial_deposit: BigDecimal,
}

#[derive(Debug)]
pub struct OpenAccountReceipt {
	pub account_id: Id,
	pub account_number: String,
	pub balance: BigDecimal,
}

pub struct DepositRequest {
	pub account_id: Id,
	pub amount: BigDecimal,
	pub description: String,
}

pub struct WithdrawalRequest {
	pub account_id: Id,
	pub amount: BigDecimal,
	/// How the funds leave the bank (e-transfer, cheque, ...)
	pub method: String,
	pub recipient_info: String,
}

pub struct TransferRequest {
	pub source_account_id: Id,
	pub recipient_account_number: String,
	pub amount: BigDecimal,
	pub description: String,
}

#[derive(Debug)]
pub struct TransferReceipt {
	pub source_balance: BigDecimal,
	pub fee_charged: BigDecimal,
}

pub struct LoanRequest {
	pub principal: BigDecimal,
	pub term_months: i16,
	/// Annual rate in basis points (500 == 5%)
	pub interest_rate: i16,
}

#[derive(Debug)]
pub struct LoanQuote {
	pub loan_id: Id,
	pub monthly_payment: BigDecimal,
}

#[derive(Debug)]
pub struct LoanGrant {
	pub account_number: String,
	pub monthly_payment: BigDecimal,
}
