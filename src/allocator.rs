use std::cmp;
use std::fmt;

use diesel::prelude::*;
use rand::Rng;

use crate::db;
use crate::schema::{accounts, loans};
use crate::user::Role;

/// How many random candidates to try before giving up. The 10-digit space
/// is sparse enough that more than one retry is already rare.
const ACCOUNT_NUMBER_ATTEMPTS: u32 = 16;

/// Unique identifier generation for account numbers and role-scoped user
/// numbers.
///
/// Both allocations must run on the connection of the unit of work that
/// inserts the claiming row: the uniqueness check and the insert then commit
/// or roll back together, and nothing can claim the value in between.
pub struct Allocator;

impl Allocator {
	pub fn new() -> Self {
		Allocator
	}

	/// Generate a 10-digit number carried by no account and no loan.
	///
	/// The column's unique constraint backs this check up; a racer that
	/// slips past it loses at insert time instead.
	pub fn account_number(&self, conn: &mut PgConnection) -> Result<String> {
		let mut rng = rand::thread_rng();

		for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
			let candidate = format!("{:010}", rng.gen_range(1..=9_999_999_999u64));

			let taken_by_account: i64 = accounts::table
				.filter(accounts::number.eq(&candidate))
				.count()
				.get_result(conn)
				.map_err(db::Error::from)?;
			let taken_by_loan: i64 = loans::table
				.filter(loans::account_number.eq(&candidate))
				.count()
				.get_result(conn)
				.map_err(db::Error::from)?;

			if taken_by_account == 0 && taken_by_loan == 0 {
				return Ok(candidate);
			}
		}

		Err(Error::ExhaustedAttempts)
	}

	/// Next user number for the role: `max(existing) + 1`, floored at the
	/// role's base.
	///
	/// Takes a per-role advisory lock so two concurrent allocations for the
	/// same role serialize; the lock releases when the enclosing transaction
	/// commits or rolls back.
	pub fn user_no(&self, conn: &mut PgConnection, role: Role) -> Result<i32> {
		diesel::sql_query(format!("SELECT pg_advisory_xact_lock({})", lock_key(role)))
			.execute(conn)
			.map_err(db::Error::from)?;

		let max = crate::user::Repo::new()
			.max_user_no(conn, role)
			.map_err(Error::Database)?;

		Ok(cmp::max(max.unwrap_or(0) + 1, role.user_no_base()))
	}
}

impl Default for Allocator {
	fn default() -> Self {
		Allocator::new()
	}
}

// One advisory-lock key per role, so different roles allocate in parallel.
fn lock_key(role: Role) -> i64 {
	match role {
		Role::Admin => 1,
		Role::Staff => 2,
		Role::Client => 3,
	}
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq)]
pub enum Error {
	/// The bounded search for a free account number came up empty
	ExhaustedAttempts,
	Database(db::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::ExhaustedAttempts => write!(f, "no free account number found within the attempt budget"),
			Error::Database(e) => write!(f, "db error: {}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<db::Error> for Error {
	fn from(e: db::Error) -> Self {
		Error::Database(e)
	}
}
