pub mod delivery;
pub mod saved_search;
pub mod user;
