use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub subscription_plan: String,
    pub created_at: String,
}

impl User {
    #[must_use]
    pub fn is_pro(&self) -> bool {
        self.subscription_plan.eq_ignore_ascii_case("pro")
    }
}
