use axum::Json;

use crate::models::MessageResponse;
use crate::routes::{Access, RouteTable};

pub const HEALTH_MESSAGE: &str = "BillSense AI Backend API is running";

pub fn route_table() -> RouteTable {
    RouteTable::new("").get("/", Access::Public, root)
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}
