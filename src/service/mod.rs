pub mod access;
pub mod secret_codec;
pub mod store;
