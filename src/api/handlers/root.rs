use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub status: String,
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: format!("{} API", env!("CARGO_PKG_NAME")),
        status: "running".to_string(),
    })
}
