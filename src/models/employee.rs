use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted employee record. `employee_id` and `created_at` are assigned
/// by the store at creation and never change afterwards.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub gender: String,
    pub course: Vec<String>,
    pub profile_photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
