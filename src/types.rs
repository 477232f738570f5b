pub type Id = uuid::Uuid;
pub type Time = chrono::DateTime<chrono::Utc>;
pub type Date = chrono::NaiveDate;
