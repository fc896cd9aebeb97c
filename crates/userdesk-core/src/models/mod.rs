//! Data models for the user-management API.
//!
//! - `Profile`: the server-owned user record
//! - `Credential`, `AuthOutcome`: results of login and registration
//! - `ProfileUpdate`, `ProfilePatch`: profile edits and their minimal wire form

pub mod user;

pub use user::{AuthOutcome, Credential, Profile, ProfilePatch, ProfileUpdate};
pub(crate) use user::{AuthResponse, LoginRequest, RegisterRequest, UserResponse, UsersResponse};
