pub mod posting;
pub mod search;
pub mod user;
