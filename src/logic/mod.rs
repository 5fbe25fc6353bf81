pub mod constraints;
pub mod experience;
pub mod filter_params;
pub mod permissions;
pub mod query_params;
pub mod search;

pub use constraints::{finish_write, translate_sqlx_error, translate_violation};
pub use experience::{total_experience, Interval};
pub use filter_params::validate_search;
pub use permissions::{authorize, evaluate, Capability, Decision, DenyReason, Policy};
pub use query_params::{by_id, EagerLoad, Predicate, QueryParams, SqlBuilder};
pub use search::{compose_search, SearchOptions, SearchTarget};
