//! Per-entity stores built on the generic CRUD layer.

mod error;

pub mod access;
pub mod user;
pub mod user_group;

pub use access::{Access, AccessStore, MongoAccessStore};
pub use error::StoreError;
pub use user::{MongoUserStore, User, UserStore};
pub use user_group::{MongoUserGroupStore, UserGroup, UserGroupStore};
