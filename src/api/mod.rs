pub mod handlers;
pub mod policies;
pub mod routes;
pub mod user_extractor;

pub use handlers::*;
pub use routes::*;
