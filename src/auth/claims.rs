use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload issued on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid, // user ID
    #[serde(rename = "type")]
    pub user_type: String,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}
