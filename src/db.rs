use std::{env, fmt};

use diesel::r2d2::ConnectionManager;
use diesel::result::DatabaseErrorKind::{ForeignKeyViolation, SerializationFailure, UniqueViolation};
use diesel::result::Error::{DatabaseError, NotFound};
use diesel::PgConnection;
use dotenv::dotenv;

pub type Result<T> = std::result::Result<T, Error>;
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConn = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Get a pooled connection to the underlying PostgreSQL database
///
/// `DATABASE_URL` must be set in the environment
/// Loads `.env` file in the environment's directory
pub fn pg_connection() -> PgPool {
	dotenv().ok();
	let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

	let manager = ConnectionManager::<PgConnection>::new(&database_url);

	r2d2::Pool::builder()
		.build(manager)
		.expect("Failed to create pool.")
}

/// Error that can occur when querying against the database
#[derive(Debug, PartialEq)]
pub enum Error {
	RecordAlreadyExists,
	RecordNotFound,
	/// The record is still referenced by other rows and cannot be removed
	RecordInUse,
	/// A lock wait timed out or the transaction lost a serialization race;
	/// the enclosing unit of work may be retried verbatim
	SerializationConflict,
	Connection(String),
	/// Catch-all for unexpected database failures
	DatabaseError(diesel::result::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::RecordAlreadyExists => write!(f, "record violates a unique constraint"),
			Error::RecordNotFound => write!(f, "record does not exist"),
			Error::RecordInUse => write!(f, "record is referenced by other rows"),
			Error::SerializationConflict => write!(f, "transaction lost a serialization race"),
			Error::Connection(e) => write!(f, "opening database connection: {}", e),
			Error::DatabaseError(e) => write!(f, "database error: {:?}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		match e {
			DatabaseError(UniqueViolation, _) => Error::RecordAlreadyExists,
			DatabaseError(ForeignKeyViolation, _) => Error::RecordInUse,
			DatabaseError(SerializationFailure, _) => Error::SerializationConflict,
			NotFound => Error::RecordNotFound,

			_ => Error::DatabaseError(e),
		}
	}
}

impl From<r2d2::Error> for Error {
	fn from(e: r2d2::Error) -> Self {
		Error::Connection(e.to_string())
	}
}
