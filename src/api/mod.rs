pub mod ai;
pub mod auth;
pub mod invoices;
pub mod root;

use crate::routes::RouteTable;

/// Every table the application mounts, in mount order.
pub fn route_tables() -> Vec<RouteTable> {
    vec![
        root::route_table(),
        auth::route_table(),
        invoices::route_table(),
        ai::route_table(),
    ]
}
