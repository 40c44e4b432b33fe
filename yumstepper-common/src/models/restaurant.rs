use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A partner restaurant users can check in at and that offers rewards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Restaurant {
    pub restaurant_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn new(name: &str, address: Option<&str>) -> Self {
        Self {
            restaurant_id: Uuid::new_v4(),
            name: name.to_string(),
            address: address.map(String::from),
            created_at: Utc::now(),
        }
    }
}
