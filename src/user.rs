use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::users;
use crate::types::{Id, Time};

/// An authenticated identity in the portal.
///
/// `user_no` is the role-scoped number shown to operators; it is allocated
/// once by [`crate::allocator`] and never reassigned. Users are deactivated,
/// never deleted.
#[derive(Queryable, Identifiable, PartialEq, Debug)]
pub struct User {
	pub id: Id,
	pub user_no: i32,
	pub role: Role,
	pub full_name: String,
	pub email: String,
	pub phone: Option<String>,
	pub password_hash: String,
	pub is_active: bool,
	pub created_at: Time,
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, Debug)]
#[diesel(sql_type = Varchar)]
pub enum Role {
	Admin,
	Staff,
	Client,
}

impl Role {
	/// Lowest user number handed out for this role.
	pub fn user_no_base(&self) -> i32 {
		match self {
			Role::Admin => 1001,
			Role::Staff => 2001,
			Role::Client => 3001,
		}
	}
}

impl ToSql<Varchar, Pg> for Role {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for Role {
	fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		Role::from_str(s).map_err(|_| format!("unrecognized role: {}", s).into())
	}
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
	pub user_no: i32,
	pub role: Role,
	pub full_name: &'a str,
	pub email: &'a str,
	pub phone: Option<&'a str>,
	pub password_hash: &'a str,
}

pub enum UserKey<'a> {
	ID(Id),
	Email(&'a str),
	Number(Role, i32),
}

pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	/// Insert a user. The email is stored lower-cased so the unique
	/// constraint is case-insensitive.
	pub fn create(&self, conn: &mut PgConnection, new_user: NewUser) -> db::Result<User> {
		let email = new_user.email.to_lowercase();
		diesel::insert_into(users::table)
			.values(&NewUser {
				email: &email,
				..new_user
			})
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find(&self, conn: &mut PgConnection, key: UserKey) -> db::Result<User> {
		match key {
			UserKey::ID(id) => users::table
				.find(id)
				.first::<User>(conn)
				.map_err(Into::into),
			UserKey::Email(email) => users::table
				.filter(users::email.eq(email.to_lowercase()))
				.first::<User>(conn)
				.map_err(Into::into),
			UserKey::Number(role, user_no) => users::table
				.filter(users::role.eq(role).and(users::user_no.eq(user_no)))
				.first::<User>(conn)
				.map_err(Into::into),
		}
	}

	pub fn set_role(&self, conn: &mut PgConnection, id: &Id, role: Role) -> db::Result<User> {
		diesel::update(users::table)
			.filter(users::id.eq(id))
			.set(users::role.eq(role))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn deactivate(&self, conn: &mut PgConnection, id: &Id) -> db::Result<User> {
		diesel::update(users::table)
			.filter(users::id.eq(id))
			.set(users::is_active.eq(false))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Highest user number currently committed for the role, if any.
	pub fn max_user_no(&self, conn: &mut PgConnection, role: Role) -> db::Result<Option<i32>> {
		use diesel::dsl::max;
		users::table
			.filter(users::role.eq(role))
			.select(max(users::user_no))
			.first(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
