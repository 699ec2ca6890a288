pub mod ids;
pub mod profile;
pub mod secret;
