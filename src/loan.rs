use std::io::Write;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::loans;
use crate::types::{Id, Time};

#[derive(Queryable, Identifiable, PartialEq, Debug)]
pub struct Loan {
	pub id: Id,
	/// The borrower
	pub user_id: Id,
	/// 10-digit reference, allocated when the loan is approved
	pub account_number: Option<String>,
	pub principal: BigDecimal,
	pub term_months: i16,
	/// Annual interest rate in basis points (500 == 5%)
	pub interest_rate: i16,
	/// Quoted at submission, recomputed and fixed at approval
	pub monthly_payment: BigDecimal,
	pub status: LoanStatus,
	pub applied_at: Time,
	pub approved_at: Option<Time>,
}

impl Loan {
	/// Annual rate as a fraction.
	pub fn annual_rate(&self) -> f64 {
		f64::from(self.interest_rate) / 10_000.0
	}
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, Debug)]
#[diesel(sql_type = Varchar)]
pub enum LoanStatus {
	Pending,
	Active,
	Rejected,
}

impl Default for LoanStatus {
	fn default() -> Self {
		LoanStatus::Pending
	}
}

impl ToSql<Varchar, Pg> for LoanStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for LoanStatus {
	fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		LoanStatus::from_str(s).map_err(|_| format!("unrecognized loan status: {}", s).into())
	}
}

#[derive(Insertable)]
#[diesel(table_name = loans)]
pub struct NewLoan<'a> {
	pub user_id: Id,
	pub principal: &'a BigDecimal,
	pub term_months: i16,
	pub interest_rate: i16,
	pub monthly_payment: &'a BigDecimal,
	pub status: LoanStatus,
	pub applied_at: Time,
}

pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn create(&self, conn: &mut PgConnection, new_loan: NewLoan) -> db::Result<Loan> {
		diesel::insert_into(loans::table)
			.values(&new_loan)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Loan> {
		loans::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	/// Lock the loan row for the enclosing transaction. Approval and
	/// rejection read the status under this lock so a loan leaves Pending
	/// at most once.
	pub fn lock(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Loan> {
		loans::table
			.find(id)
			.for_update()
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_for_user(&self, conn: &mut PgConnection, user_id: &Id) -> db::Result<Vec<Loan>> {
		loans::table
			.filter(loans::user_id.eq(user_id))
			.order(loans::applied_at.desc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn approve(
		&self,
		conn: &mut PgConnection,
		id: &Id,
		account_number: &str,
		monthly_payment: &BigDecimal,
		approved_at: Time,
	) -> db::Result<Loan> {
		diesel::update(loans::table)
			.filter(loans::id.eq(id))
			.set((
				loans::status.eq(LoanStatus::Active),
				loans::account_number.eq(account_number),
				loans::monthly_payment.eq(monthly_payment),
				loans::approved_at.eq(approved_at),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn reject(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Loan> {
		diesel::update(loans::table)
			.filter(loans::id.eq(id))
			.set(loans::status.eq(LoanStatus::Rejected))
			.get_result(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}

/// Fixed monthly payment for a fully amortizing loan, rounded to cents.
///
/// A non-positive rate degrades to straight principal division. Used both
/// for the pre-submission quote and for the payment persisted at approval,
/// so the two can never disagree.
pub fn monthly_payment(principal: &BigDecimal, annual_rate: f64, term_months: u32) -> BigDecimal {
	if term_months == 0 {
		return BigDecimal::zero();
	}

	let principal = principal.to_f64().unwrap_or(0.0);
	let raw = if annual_rate <= 0.0 {
		principal / f64::from(term_months)
	} else {
		let monthly_rate = annual_rate / 12.0;
		let factor = (1.0 + monthly_rate).powi(term_months as i32);
		principal * monthly_rate * factor / (factor - 1.0)
	};

	to_cents(raw)
}

fn to_cents(value: f64) -> BigDecimal {
	let cents = (value * 100.0).round() as i64;
	BigDecimal::new(BigInt::from(cents), 2)
}
