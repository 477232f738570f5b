use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::db;
use crate::schema::account_types;
use crate::types::Id;

/// Reference data describing a product an account can be opened under.
#[derive(Queryable, Identifiable, PartialEq, Debug)]
pub struct AccountType {
	pub id: Id,
	pub name: String,
	/// Annual interest rate as a fraction, never negative
	pub interest_rate: BigDecimal,
}

#[derive(Insertable)]
#[diesel(table_name = account_types)]
pub struct NewAccountType<'a> {
	pub name: &'a str,
	pub interest_rate: BigDecimal,
}

pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn create(&self, conn: &mut PgConnection, new_type: NewAccountType) -> db::Result<AccountType> {
		diesel::insert_into(account_types::table)
			.values(&new_type)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut PgConnection, id: &Id) -> db::Result<AccountType> {
		account_types::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_name(&self, conn: &mut PgConnection, name: &str) -> db::Result<AccountType> {
		account_types::table
			.filter(account_types::name.eq(name))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn list(&self, conn: &mut PgConnection) -> db::Result<Vec<AccountType>> {
		account_types::table
			.order(account_types::name.asc())
			.load(conn)
			.map_err(Into::into)
	}

	/// Remove a product. The accounts table references this row with
	/// `ON DELETE RESTRICT`, so deleting a type still in use surfaces as
	/// [`db::Error::RecordInUse`].
	pub fn delete(&self, conn: &mut PgConnection, id: &Id) -> db::Result<()> {
		let deleted = diesel::delete(account_types::table.filter(account_types::id.eq(id)))
			.execute(conn)?;
		if deleted == 0 {
			return Err(db::Error::RecordNotFound);
		}
		Ok(())
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
