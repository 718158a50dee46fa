use crate::error::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("error creating user")]
    CreateUser(#[source] DatabaseError),

    #[error("error updating user")]
    UpdateUser(#[source] DatabaseError),

    #[error("error getting user by id")]
    GetUser(#[source] DatabaseError),

    #[error("error deleting user")]
    DeleteUser(#[source] DatabaseError),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("error creating user group")]
    CreateUserGroup(#[source] DatabaseError),

    #[error("error updating user group name")]
    UpdateUserGroupName(#[source] DatabaseError),

    #[error("error updating user group membership")]
    UpdateUserGroupMembers(#[source] DatabaseError),

    #[error("error getting user group by id")]
    GetUserGroup(#[source] DatabaseError),

    #[error("error deleting user group")]
    DeleteUserGroup(#[source] DatabaseError),

    #[error("user group {0} not found")]
    UserGroupNotFound(String),

    #[error("error granting access")]
    GrantAccess(#[source] DatabaseError),

    #[error("error revoking access")]
    RevokeAccess(#[source] DatabaseError),

    #[error("error listing access records")]
    ListAccess(#[source] DatabaseError),

    #[error("entity has no id")]
    MissingId,
}
