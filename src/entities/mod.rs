pub mod prelude;

pub mod delivery_records;
pub mod saved_searches;
pub mod users;
