use std::fmt;

use crate::{allocator, db};

/// An error that can occur while moving money
#[derive(Debug, PartialEq)]
pub struct Error {
	kind: ErrorKind,
}

impl Error {
	pub fn new(kind: ErrorKind) -> Error {
		Error { kind }
	}

	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// Whether the caller may retry the operation verbatim. Everything else
	/// needs corrected input first.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self.kind,
			ErrorKind::AllocationConflict
				| ErrorKind::Store(db::Error::SerializationConflict)
				| ErrorKind::Store(db::Error::Connection(_))
		)
	}
}

/// The kind of an error that can occur.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
	/// Malformed or out-of-range input
	Validation(String),
	/// Unknown, inactive, or self-referential target account
	InvalidAccount,
	InsufficientFunds,
	/// The loan already left Pending; nothing was disbursed
	LoanNotPending,
	/// The borrower has no active account to receive loan funds
	NoReceivingAccount,
	/// Identifier allocation collided or lost a serialization race
	AllocationConflict,
	Store(db::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			ErrorKind::Validation(msg) => write!(f, "invalid request: {}", msg),
			ErrorKind::InvalidAccount => write!(f, "account is unknown, inactive, or the same as the source"),
			ErrorKind::InsufficientFunds => write!(f, "not enough funds in account"),
			ErrorKind::LoanNotPending => write!(f, "loan is not pending"),
			ErrorKind::NoReceivingAccount => write!(f, "borrower has no active account to receive funds"),
			ErrorKind::AllocationConflict => write!(f, "identifier allocation conflict, retry the operation"),
			ErrorKind::Store(e) => write!(f, "store error: {}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<db::Error> for Error {
	fn from(e: db::Error) -> Self {
		Error::new(ErrorKind::Store(e))
	}
}

impl From<r2d2::Error> for Error {
	fn from(e: r2d2::Error) -> Self {
		Error::new(ErrorKind::Store(db::Error::from(e)))
	}
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		Error::new(ErrorKind::Store(db::Error::from(e)))
	}
}

impl From<allocator::Error> for Error {
	fn from(e: allocator::Error) -> Self {
		match e {
			allocator::Error::ExhaustedAttempts => Error::new(ErrorKind::AllocationConflict),
			allocator::Error::Database(db::Error::SerializationConflict) => {
				Error::new(ErrorKind::AllocationConflict)
			}
			allocator::Error::Database(e) => Error::from(e),
		}
	}
}
