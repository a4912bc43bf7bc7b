//! Auth-domain identifiers plus the user, social association, and token models.

pub mod id;
pub mod social;
pub mod token;
pub mod user;

pub use id::*;
pub use social::*;
pub use token::*;
pub use user::*;
