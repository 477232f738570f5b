use std::io::Write;
use std::ops::Neg;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::transactions;
use crate::types::{Id, Time};

/// An immutable ledger row. Amounts are always stored positive; the type
/// carries the direction.
#[derive(Queryable, Identifiable, PartialEq, Debug)]
pub struct Transaction {
	pub id: Id,
	pub account_id: Id,
	pub transaction_type: TransactionType,
	pub amount: BigDecimal,
	pub description: String,
	/// Account number on the far side of a transfer, or the `BANK_FEE`
	/// sentinel for fee rows
	pub counterparty: Option<String>,
	pub status: TransactionStatus,
	pub created_at: Time,
}

impl Transaction {
	/// Amount with the sign implied by the transaction type.
	pub fn signed_amount(&self) -> BigDecimal {
		if self.transaction_type.is_credit() {
			self.amount.clone()
		} else {
			(&self.amount).neg()
		}
	}
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, Debug)]
#[diesel(sql_type = Varchar)]
pub enum TransactionType {
	Deposit,
	Withdrawal,
	#[strum(serialize = "Transfer-Debit")]
	TransferDebit,
	#[strum(serialize = "Transfer-Credit")]
	TransferCredit,
	Fee,
	#[strum(serialize = "Loan Disbursement")]
	LoanDisbursement,
	#[strum(serialize = "Loan Payment")]
	LoanPayment,
}

impl TransactionType {
	/// Whether rows of this type increase the account balance.
	pub fn is_credit(&self) -> bool {
		matches!(
			self,
			TransactionType::Deposit | TransactionType::TransferCredit | TransactionType::LoanDisbursement
		)
	}
}

impl ToSql<Varchar, Pg> for TransactionType {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for TransactionType {
	fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		TransactionType::from_str(s).map_err(|_| format!("unrecognized transaction type: {}", s).into())
	}
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, Debug)]
#[diesel(sql_type = Varchar)]
pub enum TransactionStatus {
	Completed,
	/// Withdrawal requests wait here until an operator dispatches the funds
	#[strum(serialize = "Pending Dispatch")]
	PendingDispatch,
}

impl Default for TransactionStatus {
	fn default() -> Self {
		TransactionStatus::Completed
	}
}

impl ToSql<Varchar, Pg> for TransactionStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for TransactionStatus {
	fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		TransactionStatus::from_str(s).map_err(|_| format!("unrecognized transaction status: {}", s).into())
	}
}

#[derive(Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction<'a> {
	pub account_id: &'a Id,
	pub transaction_type: TransactionType,
	pub amount: &'a BigDecimal,
	pub description: &'a str,
	pub counterparty: Option<&'a str>,
	pub status: TransactionStatus,
}

/// Data store implementation for operating on the append-only ledger
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	/// Append a ledger row. Rows are never updated or deleted afterwards.
	pub fn append(&self, conn: &mut PgConnection, new_transaction: NewTransaction) -> db::Result<Transaction> {
		diesel::insert_into(transactions::table)
			.values(&new_transaction)
			.get_result::<Transaction>(conn)
			.map_err(Into::into)
	}

	pub fn find_for_account(&self, conn: &mut PgConnection, account_id: &Id) -> db::Result<Vec<Transaction>> {
		transactions::table
			.filter(transactions::account_id.eq(account_id))
			.order(transactions::created_at.desc())
			.load(conn)
			.map_err(Into::into)
	}

	/// The definitional balance: signed sum of every committed row for the
	/// account.
	pub fn ledger_balance(&self, conn: &mut PgConnection, account_id: &Id) -> db::Result<BigDecimal> {
		let rows = self.find_for_account(conn, account_id)?;
		Ok(rows
			.iter()
			.fold(BigDecimal::zero(), |acc, row| acc + row.signed_amount()))
	}

	pub fn count_for_account(&self, conn: &mut PgConnection, account_id: &Id) -> db::Result<i64> {
		transactions::table
			.filter(transactions::account_id.eq(account_id))
			.count()
			.get_result(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
