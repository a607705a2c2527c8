// HTTP route groups. Each module exposes `routes(&AppContext) -> Router`
// with its own URL prefix; `routes::create_router` merges them in order.

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod interactions;
pub mod models;
pub mod recipes;
pub mod recommendations;
pub mod routes;
pub mod search;
pub mod uploads;
pub mod users;

pub use handlers::AppContext;
