//! Alarm profile handlers, including the activation coordinator.

mod activate_profile;
mod add_profile;
mod delete_profile;
mod update_profile;

pub use activate_profile::{ActivateProfileCommand, ActivateProfileHandler};
pub use add_profile::{AddProfileCommand, AddProfileHandler};
pub use delete_profile::{DeleteProfileCommand, DeleteProfileHandler};
pub use update_profile::{UpdateProfileCommand, UpdateProfileHandler};
