pub mod address;
pub mod candidate;
pub mod common;
pub mod company;
pub mod filter;
pub mod user;
pub mod user_context;

pub use address::*;
pub use candidate::*;
pub use common::*;
pub use company::*;
pub use filter::*;
pub use user::*;
pub use user_context::*;
