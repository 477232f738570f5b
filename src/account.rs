use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::db;
use crate::schema::accounts;
use crate::types::{Date, Id, Time};
use crate::user::User;

/// A customer account and its cached balance.
///
/// The balance column is a projection of the signed transaction history; it
/// is only ever touched through [`Repo::apply_delta`] inside the same unit
/// of work that appends the justifying ledger rows.
#[derive(Queryable, Identifiable, Associations, PartialEq, Debug)]
#[diesel(belongs_to(User))]
pub struct Account {
	pub id: Id,
	pub user_id: Id,
	/// 10-digit portal-visible number, immutable once assigned
	pub number: String,
	pub type_id: Id,
	pub balance: BigDecimal,
	pub opened_on: Date,
	pub is_active: bool,
	pub created_at: Time,
}

#[derive(Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount<'a> {
	pub user_id: Id,
	pub number: &'a str,
	pub type_id: Id,
	pub opened_on: Date,
}

pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn create(&self, conn: &mut PgConnection, new_account: NewAccount) -> db::Result<Account> {
		diesel::insert_into(accounts::table)
			.values(&new_account)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Account> {
		accounts::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_number(&self, conn: &mut PgConnection, number: &str) -> db::Result<Account> {
		accounts::table
			.filter(accounts::number.eq(number))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_for_user(&self, conn: &mut PgConnection, user_id: &Id) -> db::Result<Vec<Account>> {
		accounts::table
			.filter(accounts::user_id.eq(user_id))
			.order(accounts::number.asc())
			.load(conn)
			.map_err(Into::into)
	}

	/// Lock and return the user's oldest active account. Used as the
	/// receiving account for loan disbursements.
	pub fn first_active_for_user(&self, conn: &mut PgConnection, user_id: &Id) -> db::Result<Account> {
		accounts::table
			.filter(accounts::user_id.eq(user_id).and(accounts::is_active.eq(true)))
			.order(accounts::created_at.asc())
			.for_update()
			.first(conn)
			.map_err(Into::into)
	}

	/// Acquire an exclusive row lock on the account for the duration of the
	/// enclosing transaction and return its current state.
	pub fn lock(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Account> {
		accounts::table
			.find(id)
			.for_update()
			.first(conn)
			.map_err(Into::into)
	}

	/// Lock two accounts in ascending id order, whichever side the caller
	/// names first. Crossing transfers would otherwise deadlock.
	pub fn lock_pair(
		&self,
		conn: &mut PgConnection,
		first: &Id,
		second: &Id,
	) -> db::Result<(Account, Account)> {
		if first <= second {
			let a = self.lock(conn, first)?;
			let b = self.lock(conn, second)?;
			Ok((a, b))
		} else {
			let b = self.lock(conn, second)?;
			let a = self.lock(conn, first)?;
			Ok((a, b))
		}
	}

	/// Add a signed amount to the cached balance. The caller must hold the
	/// row lock acquired earlier in the same transaction.
	pub fn apply_delta(&self, conn: &mut PgConnection, id: &Id, delta: &BigDecimal) -> db::Result<Account> {
		diesel::update(accounts::table)
			.filter(accounts::id.eq(id))
			.set(accounts::balance.eq(accounts::balance + delta))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn deactivate(&self, conn: &mut PgConnection, id: &Id) -> db::Result<Account> {
		diesel::update(accounts::table)
			.filter(accounts::id.eq(id))
			.set(accounts::is_active.eq(false))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn count_by_number(&self, conn: &mut PgConnection, number: &str) -> db::Result<i64> {
		accounts::table
			.filter(accounts::number.eq(number))
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
