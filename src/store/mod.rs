pub mod accessor;
pub mod postgres;
pub mod traits;

pub use accessor::*;
pub use postgres::*;
pub use traits::*;
