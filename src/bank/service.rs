use std::ops::Neg;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use diesel::Connection;
use log::info;

use crate::account::{self, NewAccount};
use crate::account_type;
use crate::allocator::Allocator;
use crate::config::Settings;
use crate::loan::{self, LoanStatus, NewLoan};
use crate::transaction::{self, NewTransaction, TransactionStatus, TransactionType};
use crate::types::{Date, Time};
use crate::user::{self, UserKey};
use crate::{db, Id};

use super::error::{Error, ErrorKind};
use super::{
	Caller, DepositRequest, LoanGrant, LoanQuote, LoanRequest, OpenAccountReceipt,
	OpenAccountRequest, TransferReceipt, TransferRequest, WithdrawalRequest,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Service for performing banking operations
///
/// Every operation is one atomic unit of work: balance deltas and ledger
/// rows commit together or not at all. Row locks acquired inside an
/// operation are held until its transaction resolves.
pub struct Service<'a> {
	db: db::PgPool,
	settings: Settings,
	user_repo: &'a user::Repo,
	account_repo: &'a account::Repo,
	account_type_repo: &'a account_type::Repo,
	transaction_repo: &'a transaction::Repo,
	loan_repo: &'a loan::Repo,
	allocator: &'a Allocator,
	calendar: &'a dyn Calendar,
}

/// Parameter object for creating a new Service
pub struct NewService<'a> {
	pub db: db::PgPool,
	pub settings: Settings,
	pub user_repo: &'a user::Repo,
	pub account_repo: &'a account::Repo,
	pub account_type_repo: &'a account_type::Repo,
	pub transaction_repo: &'a transaction::Repo,
	pub loan_repo: &'a loan::Repo,
	pub allocator: &'a Allocator,
	pub calendar: &'a dyn Calendar,
}

impl<'a> Service<'a> {
	pub fn new(v: NewService<'a>) -> Self {
		Service {
			db: v.db,
			settings: v.settings,
			user_repo: v.user_repo,
			account_repo: v.account_repo,
			account_type_repo: v.account_type_repo,
			transaction_repo: v.transaction_repo,
			loan_repo: v.loan_repo,
			allocator: v.allocator,
			calendar: v.calendar,
		}
	}

	/// Open a new account for a user, optionally seeding it with an initial
	/// deposit.
	///
	/// Allocates the 10-digit account number inside the same unit of work
	/// that inserts the account row, so a concurrent opener can never commit
	/// the same number.
	pub fn open_account(&self, caller: &Caller, req: OpenAccountRequest) -> Result<OpenAccountReceipt> {
		if req.initial_deposit < BigDecimal::zero() {
			return Err(validation("initial deposit cannot be negative"));
		}

		let mut conn = self.db.get()?;
		let receipt = conn.transaction::<OpenAccountReceipt, Error, _>(|conn| {
			let owner = self
				.user_repo
				.find(conn, UserKey::ID(req.user_id))
				.map_err(|e| not_found_as(e, validation("unknown user")))?;
			if !owner.is_active {
				return Err(validation("user is deactivated"));
			}
			self.account_type_repo
				.find_by_id(conn, &req.type_id)
				.map_err(|e| not_found_as(e, validation("unknown account type")))?;

			let number = self.allocator.account_number(conn)?;
			let account = self
				.account_repo
				.create(conn, NewAccount {
					user_id: owner.id,
					number: &number,
					type_id: req.type_id,
					opened_on: self.calendar.today(),
				})
				.map_err(allocation_conflict)?;

			let mut balance = account.balance;
			if req.initial_deposit > BigDecimal::zero() {
				balance = self
					.account_repo
					.apply_delta(conn, &account.id, &req.initial_deposit)?
					.balance;
				self.transaction_repo.append(conn, NewTransaction {
					account_id: &account.id,
					transaction_type: TransactionType::Deposit,
					amount: &req.initial_deposit,
					description: "Initial deposit upon account opening",
					counterparty: None,
					status: TransactionStatus::Completed,
				})?;
			}

			Ok(OpenAccountReceipt {
				account_id: account.id,
				account_number: number,
				balance,
			})
		})?;

		info!(
			"user {} opened account {} for user {}",
			caller.user_id, receipt.account_number, req.user_id
		);
		Ok(receipt)
	}

	/// Credit funds to an account. Returns the new balance.
	pub fn deposit(&self, caller: &Caller, req: DepositRequest) -> Result<BigDecimal> {
		if req.amount <= BigDecimal::zero() {
			return Err(validation("deposit amount must be positive"));
		}
		if req.amount < self.settings.min_deposit {
			return Err(validation("deposit amount is below the minimum"));
		}

		let mut conn = self.db.get()?;
		let balance = conn.transaction::<BigDecimal, Error, _>(|conn| {
			let account = self
				.account_repo
				.lock(conn, &req.account_id)
				.map_err(invalid_account)?;
			if !account.is_active {
				return Err(Error::new(ErrorKind::InvalidAccount));
			}

			let account = self.account_repo.apply_delta(conn, &account.id, &req.amount)?;
			self.transaction_repo.append(conn, NewTransaction {
				account_id: &account.id,
				transaction_type: TransactionType::Deposit,
				amount: &req.amount,
				description: &req.description,
				counterparty: None,
				status: TransactionStatus::Completed,
			})?;

			Ok(account.balance)
		})?;

		info!("user {} deposited {} into account {}", caller.user_id, req.amount, req.account_id);
		Ok(balance)
	}

	/// Debit funds for dispatch outside the bank. The ledger row stays in
	/// "Pending Dispatch" until an operator completes the payout; the
	/// balance is debited immediately. Returns the new balance.
	pub fn withdraw(&self, caller: &Caller, req: WithdrawalRequest) -> Result<BigDecimal> {
		if req.amount <= BigDecimal::zero() {
			return Err(validation("withdrawal amount must be positive"));
		}

		let mut conn = self.db.get()?;
		let balance = conn.transaction::<BigDecimal, Error, _>(|conn| {
			let account = self
				.account_repo
				.lock(conn, &req.account_id)
				.map_err(invalid_account)?;
			if !account.is_active {
				return Err(Error::new(ErrorKind::InvalidAccount));
			}
			if account.balance < req.amount {
				return Err(Error::new(ErrorKind::InsufficientFunds));
			}

			let account = self
				.account_repo
				.apply_delta(conn, &account.id, &(&req.amount).neg())?;
			let description = format!(
				"Withdrawal request via {}. Recipient: {}",
				req.method, req.recipient_info
			);
			self.transaction_repo.append(conn, NewTransaction {
				account_id: &account.id,
				transaction_type: TransactionType::Withdrawal,
				amount: &req.amount,
				description: &description,
				counterparty: None,
				status: TransactionStatus::PendingDispatch,
			})?;

			Ok(account.balance)
		})?;

		info!("user {} withdrew {} from account {}", caller.user_id, req.amount, req.account_id);
		Ok(balance)
	}

	/// Move funds between two accounts, charging the configured fee to the
	/// source.
	///
	/// The fee is debited but credited to no account; it represents bank
	/// revenue collected outside the ledger's account set.
	pub fn transfer(&self, caller: &Caller, req: TransferRequest) -> Result<TransferReceipt> {
		if req.amount <= BigDecimal::zero() {
			return Err(validation("transfer amount must be positive"));
		}
		if req.recipient_account_number.is_empty() {
			return Err(validation("recipient account number is required"));
		}

		let mut conn = self.db.get()?;
		let receipt = conn.transaction::<TransferReceipt, Error, _>(|conn| {
			let recipient = self
				.account_repo
				.find_by_number(conn, &req.recipient_account_number)
				.map_err(invalid_account)?;
			if !recipient.is_active || recipient.id == req.source_account_id {
				return Err(Error::new(ErrorKind::InvalidAccount));
			}

			// Both rows lock in canonical order before either side is
			// trusted; the recipient snapshot above was unlocked, so its
			// activity must be re-read here too.
			let (source, recipient) = self
				.account_repo
				.lock_pair(conn, &req.source_account_id, &recipient.id)
				.map_err(invalid_account)?;
			if !source.is_active || !recipient.is_active {
				return Err(Error::new(ErrorKind::InvalidAccount));
			}

			let fee = (&req.amount * &self.settings.transfer_fee_rate)
				.with_scale_round(2, RoundingMode::HalfUp);
			let total_debit = &req.amount + &fee;
			if source.balance < total_debit {
				return Err(Error::new(ErrorKind::InsufficientFunds));
			}

			let source_after = self
				.account_repo
				.apply_delta(conn, &source.id, &(&total_debit).neg())?;
			self.account_repo.apply_delta(conn, &recipient.id, &req.amount)?;

			let debit_description = format!("{} (To: {})", req.description, recipient.number);
			self.transaction_repo.append(conn, NewTransaction {
				account_id: &source.id,
				transaction_type: TransactionType::TransferDebit,
				amount: &total_debit,
				description: &debit_description,
				counterparty: Some(&recipient.number),
				status: TransactionStatus::Completed,
			})?;

			let credit_description = format!("Transfer received from account {}", source.number);
			self.transaction_repo.append(conn, NewTransaction {
				account_id: &recipient.id,
				transaction_type: TransactionType::TransferCredit,
				amount: &req.amount,
				description: &credit_description,
				counterparty: Some(&source.number),
				status: TransactionStatus::Completed,
			})?;

			if fee > BigDecimal::zero() {
				let fee_description = format!("Transfer fee for transfer to {}", recipient.number);
				self.transaction_repo.append(conn, NewTransaction {
					account_id: &source.id,
					transaction_type: TransactionType::Fee,
					amount: &fee,
					description: &fee_description,
					counterparty: Some("BANK_FEE"),
					status: TransactionStatus::Completed,
				})?;
			}

			Ok(TransferReceipt {
				source_balance: source_after.balance,
				fee_charged: fee,
			})
		})?;

		info!(
			"user {} transferred {} from account {} to {} (fee {})",
			caller.user_id, req.amount, req.source_account_id, req.recipient_account_number, receipt.fee_charged
		);
		Ok(receipt)
	}

	/// File a loan application for the calling borrower. Returns the loan id
	/// and the quoted monthly payment; the quote uses the same amortization
	/// as the final payment fixed at approval.
	pub fn submit_loan(&self, caller: &Caller, req: LoanRequest) -> Result<LoanQuote> {
		if req.principal <= BigDecimal::zero() {
			return Err(validation("loan principal must be positive"));
		}
		if req.term_months < 1 || req.term_months > 360 {
			return Err(validation("loan term must be between 1 and 360 months"));
		}
		if req.interest_rate < 0 {
			return Err(validation("interest rate cannot be negative"));
		}

		let quote = loan::monthly_payment(
			&req.principal,
			f64::from(req.interest_rate) / 10_000.0,
			req.term_months as u32,
		);

		let mut conn = self.db.get()?;
		let loan = conn.transaction::<loan::Loan, Error, _>(|conn| {
			self.loan_repo
				.create(conn, NewLoan {
					user_id: caller.user_id,
					principal: &req.principal,
					term_months: req.term_months,
					interest_rate: req.interest_rate,
					monthly_payment: &quote,
					status: LoanStatus::default(),
					applied_at: self.calendar.current_time(),
				})
				.map_err(Into::into)
		})?;

		info!("user {} submitted loan {} for {}", caller.user_id, loan.id, req.principal);
		Ok(LoanQuote {
			loan_id: loan.id,
			monthly_payment: quote,
		})
	}

	/// Approve a pending loan: fix the monthly payment, assign the loan
	/// account number, and disburse the principal to the borrower's first
	/// active account.
	///
	/// Re-invoking on a non-pending loan fails with `LoanNotPending` and
	/// disburses nothing. If the borrower has no active account the whole
	/// unit of work rolls back and the loan stays Pending.
	pub fn approve_loan(&self, caller: &Caller, loan_id: &Id) -> Result<LoanGrant> {
		let mut conn = self.db.get()?;
		let grant = conn.transaction::<LoanGrant, Error, _>(|conn| {
			let loan = self
				.loan_repo
				.lock(conn, loan_id)
				.map_err(|e| not_found_as(e, validation("unknown loan")))?;
			if loan.status != LoanStatus::Pending {
				return Err(Error::new(ErrorKind::LoanNotPending));
			}

			let payment = loan::monthly_payment(
				&loan.principal,
				loan.annual_rate(),
				loan.term_months as u32,
			);
			let number = self.allocator.account_number(conn)?;

			let receiving = self
				.account_repo
				.first_active_for_user(conn, &loan.user_id)
				.map_err(|e| not_found_as(e, Error::new(ErrorKind::NoReceivingAccount)))?;

			self.loan_repo
				.approve(conn, loan_id, &number, &payment, self.calendar.current_time())
				.map_err(allocation_conflict)?;
			self.account_repo.apply_delta(conn, &receiving.id, &loan.principal)?;

			let description = format!("Loan disbursement (Loan: {}, Account: {})", loan.id, number);
			self.transaction_repo.append(conn, NewTransaction {
				account_id: &receiving.id,
				transaction_type: TransactionType::LoanDisbursement,
				amount: &loan.principal,
				description: &description,
				counterparty: None,
				status: TransactionStatus::Completed,
			})?;

			Ok(LoanGrant {
				account_number: number,
				monthly_payment: payment,
			})
		})?;

		info!("user {} approved loan {} (account {})", caller.user_id, loan_id, grant.account_number);
		Ok(grant)
	}

	/// Reject a pending loan. Terminal; no ledger movement.
	pub fn reject_loan(&self, caller: &Caller, loan_id: &Id) -> Result<loan::Loan> {
		let mut conn = self.db.get()?;
		let loan = conn.transaction::<loan::Loan, Error, _>(|conn| {
			let loan = self
				.loan_repo
				.lock(conn, loan_id)
				.map_err(|e| not_found_as(e, validation("unknown loan")))?;
			if loan.status != LoanStatus::Pending {
				return Err(Error::new(ErrorKind::LoanNotPending));
			}

			self.loan_repo.reject(conn, loan_id).map_err(Into::into)
		})?;

		info!("user {} rejected loan {}", caller.user_id, loan_id);
		Ok(loan)
	}

	/// Quote a monthly payment without touching any state.
	pub fn quote_monthly_payment(
		&self,
		principal: &BigDecimal,
		annual_rate: f64,
		term_months: u32,
	) -> BigDecimal {
		loan::monthly_payment(principal, annual_rate, term_months)
	}
}

fn validation(msg: &str) -> Error {
	Error::new(ErrorKind::Validation(msg.to_string()))
}

fn invalid_account(e: db::Error) -> Error {
	not_found_as(e, Error::new(ErrorKind::InvalidAccount))
}

fn not_found_as(e: db::Error, replacement: Error) -> Error {
	match e {
		db::Error::RecordNotFound => replacement,
		e => e.into(),
	}
}

// A freshly allocated number lost to a concurrent claimer at commit time;
// the caller may retry with a new allocation.
fn allocation_conflict(e: db::Error) -> Error {
	match e {
		db::Error::RecordAlreadyExists => Error::new(ErrorKind::AllocationConflict),
		e => e.into(),
	}
}

pub trait Calendar {
	/// Gets the current instant
	fn current_time(&self) -> Time {
		chrono::Utc::now()
	}

	/// Gets the current date
	fn today(&self) -> Date {
		chrono::Utc::now().date_naive()
	}
}

/// Calendar backed by the system clock
pub struct WallClock;

impl Calendar for WallClock {}
