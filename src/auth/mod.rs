pub mod client_secret;
pub mod oauth;
pub mod token_manager;

pub use client_secret::ClientSecretCredential;
pub use token_manager::DeviceCodeCredential;
