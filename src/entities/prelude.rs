pub use super::delivery_records::Entity as DeliveryRecords;
pub use super::saved_searches::Entity as SavedSearches;
pub use super::users::Entity as Users;
