use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::transaction::{Transaction, TransactionType};
use crate::types::Id;
use crate::{account, db, transaction};

/// Read-only aggregation over the ledger, consumed by statements and audit
/// screens. Never mutates anything.
pub struct Reporter<'a> {
	account_repo: &'a account::Repo,
	transaction_repo: &'a transaction::Repo,
}

/// Cached balance versus the signed sum of the account's ledger rows.
/// The two must agree at every quiescent point.
#[derive(Debug, PartialEq)]
pub struct AccountAudit {
	pub account_id: Id,
	pub cached_balance: BigDecimal,
	pub ledger_balance: BigDecimal,
}

impl AccountAudit {
	pub fn is_consistent(&self) -> bool {
		self.cached_balance == self.ledger_balance
	}
}

impl<'a> Reporter<'a> {
	pub fn new(account_repo: &'a account::Repo, transaction_repo: &'a transaction::Repo) -> Self {
		Reporter {
			account_repo,
			transaction_repo,
		}
	}

	/// Full movement history for an account, newest first.
	pub fn statement(&self, conn: &mut PgConnection, account_id: &Id) -> db::Result<Vec<Transaction>> {
		self.transaction_repo.find_for_account(conn, account_id)
	}

	pub fn audit_account(&self, conn: &mut PgConnection, account_id: &Id) -> db::Result<AccountAudit> {
		let account = self.account_repo.find_by_id(conn, account_id)?;
		let ledger_balance = self.transaction_repo.ledger_balance(conn, account_id)?;

		Ok(AccountAudit {
			account_id: account.id,
			cached_balance: account.balance,
			ledger_balance,
		})
	}

	/// Gross turnover per transaction type for one account, for the
	/// financial-reporting screens.
	pub fn totals_by_type(
		&self,
		conn: &mut PgConnection,
		account_id: &Id,
	) -> db::Result<Vec<(TransactionType, BigDecimal)>> {
		let rows = self.transaction_repo.find_for_account(conn, account_id)?;

		let mut totals: Vec<(TransactionType, BigDecimal)> = Vec::new();
		for row in rows {
			match totals.iter_mut().find(|(t, _)| *t == row.transaction_type) {
				Some((_, total)) => *total += &row.amount,
				None => totals.push((row.transaction_type, row.amount)),
			}
		}
		totals.sort_by_key(|(t, _)| t.to_string());

		Ok(totals)
	}
}
