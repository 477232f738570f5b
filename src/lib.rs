pub mod schema;
pub mod types;

pub mod db;

pub mod config;

pub mod account;
pub mod account_type;
pub mod loan;
pub mod transaction;
pub mod user;

pub mod allocator;
pub mod bank;
pub mod report;

pub use crate::account::{Account, NewAccount};
pub use crate::account_type::{AccountType, NewAccountType};
pub use crate::allocator::Allocator;
pub use crate::bank::error::{Error, ErrorKind};
pub use crate::bank::service::{Calendar, NewService, Service as BankService, WallClock};
pub use crate::bank::{
	Caller, DepositRequest, LoanGrant, LoanQuote, LoanRequest, OpenAccountReceipt,
	OpenAccountRequest, TransferReceipt, TransferRequest, WithdrawalRequest,
};
pub use crate::config::Settings;
pub use crate::db::{pg_connection, PgPool};
pub use crate::loan::{monthly_payment, Loan, LoanStatus, NewLoan};
pub use crate::report::{AccountAudit, Reporter};
pub use crate::transaction::{NewTransaction, Transaction, TransactionStatus, TransactionType};
pub use crate::types::{Date, Id, Time};
pub use crate::user::{NewUser, Role, User, UserKey};

pub type Result<T> = std::result::Result<T, Error>;
