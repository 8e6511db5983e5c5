pub mod auth;
pub mod policy;

pub use auth::AuthUser;
pub use policy::{OwnerSpace, Permission};
