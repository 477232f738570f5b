#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard, OnceLock};

pub use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::PgConnection;

pub use bank_core::*;

// The suite shares one database; tests serialize on this lock so one test's
// teardown cannot wipe another's rows mid-flight.
static DB_GUARD: OnceLock<Mutex<()>> = OnceLock::new();

fn db_lock() -> MutexGuard<'static, ()> {
	DB_GUARD
		.get_or_init(|| Mutex::new(()))
		.lock()
		.unwrap_or_else(|e| e.into_inner())
}

pub struct Fixture {
	pub pool: PgPool,
	pub user_factory: UserFactory,
	pub account_factory: AccountFactory,
	_guard: MutexGuard<'static, ()>,
}

impl Fixture {
	pub fn new() -> Self {
		let guard = db_lock();
		let pool = pg_connection();
		let user_factory = UserFactory::new(pool.clone());
		let account_factory = AccountFactory::new(pool.clone());
		Fixture {
			pool,
			user_factory,
			account_factory,
			_guard: guard,
		}
	}

	pub fn pool(&self) -> PgPool {
		self.pool.clone()
	}

	pub fn conn(&self) -> db::PgPooledConn {
		self.pool.get().unwrap()
	}

	pub fn teardown(&self) {
		let tables = vec!["transactions", "loans", "accounts", "account_types", "users"];
		let conn = &mut self.conn();
		for table in tables {
			diesel::sql_query(format!("DELETE FROM {}", table))
				.execute(conn)
				.expect("deleting db table");
		}
	}
}

pub struct Suite {
	pub user_repo: user::Repo,
	pub account_repo: account::Repo,
	pub account_type_repo: account_type::Repo,
	pub transaction_repo: transaction::Repo,
	pub loan_repo: loan::Repo,
	pub allocator: Allocator,
}

impl Suite {
	pub fn setup(fixture: &Fixture) -> Self {
		fixture.teardown();

		Suite {
			user_repo: user::Repo::new(),
			account_repo: account::Repo::new(),
			account_type_repo: account_type::Repo::new(),
			transaction_repo: transaction::Repo::new(),
			loan_repo: loan::Repo::new(),
			allocator: Allocator::new(),
		}
	}
}

pub fn caller_for(user: &User) -> Caller {
	Caller {
		user_id: user.id,
		role: user.role,
	}
}

pub struct UserFactory {
	pool: PgPool,
}

impl UserFactory {
	fn new(pool: PgPool) -> Self {
		UserFactory { pool }
	}

	pub fn user(&self, role: Role, full_name: &str, email: &str) -> User {
		let conn = &mut self.pool.get().unwrap();
		conn.transaction::<User, Error, _>(|conn| {
			let user_no = Allocator::new().user_no(conn, role)?;
			user::Repo::new()
				.create(conn, NewUser {
					user_no,
					role,
					full_name,
					email,
					phone: None,
					password_hash: "not-a-real-hash",
				})
				.map_err(Into::into)
		})
		.unwrap()
	}

	pub fn bob(&self) -> User {
		self.user(Role::Client, "Bob Roberts", "bob@gmail.com")
	}

	pub fn lucy(&self) -> User {
		self.user(Role::Client, "Lucy Luke", "lucy@gmail.com")
	}

	pub fn teller(&self) -> User {
		self.user(Role::Staff, "Tess Teller", "tess@securebank.test")
	}
}

pub struct AccountFactory {
	pool: PgPool,
}

impl AccountFactory {
	fn new(pool: PgPool) -> Self {
		AccountFactory { pool }
	}

	/// The default product, created on first use.
	pub fn checking_type(&self) -> AccountType {
		let conn = &mut self.pool.get().unwrap();
		find_or_create_checking(conn)
	}

	pub fn account_for(&self, user_id: Id) -> Account {
		let conn = &mut self.pool.get().unwrap();
		conn.transaction::<Account, Error, _>(|conn| {
			let account_type = find_or_create_checking(conn);
			let number = Allocator::new().account_number(conn)?;
			account::Repo::new()
				.create(conn, NewAccount {
					user_id,
					number: &number,
					type_id: account_type.id,
					opened_on: Date::from_ymd_opt(2026, 1, 1).unwrap(),
				})
				.map_err(Into::into)
		})
		.unwrap()
	}

	/// An account seeded with a balance directly, bypassing the ledger.
	/// Only for tests that do not audit balance-versus-ledger consistency.
	pub fn funded_account_for(&self, user_id: Id, amount: u32) -> Account {
		let account = self.account_for(user_id);
		let conn = &mut self.pool.get().unwrap();
		account::Repo::new()
			.apply_delta(conn, &account.id, &BigDecimal::from(amount))
			.unwrap()
	}
}

fn find_or_create_checking(conn: &mut PgConnection) -> AccountType {
	let repo = account_type::Repo::new();
	repo.find_by_name(conn, "Checking")
		.or_else(|_| {
			repo.create(conn, NewAccountType {
				name: "Checking",
				interest_rate: BigDecimal::from(0),
			})
		})
		.unwrap()
}

#[test]
fn suite_setup() {
	let fixture = Fixture::new();
	let _suite = Suite::setup(&fixture);
}
