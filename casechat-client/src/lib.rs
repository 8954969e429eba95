//! # casechat-client
//!
//! HTTP access to the case chat API.
//!
//! [`ApiClient`] talks to the conversation endpoints. It plugs into the
//! streaming session as its [`MessageTransport`](casechat_streaming::MessageTransport)
//! and into the chat view as its [`MessageStore`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use casechat_client::{ApiClient, ClientConfig};
//! use casechat_core::ConversationId;
//!
//! # async fn example() -> Result<(), casechat_client::ClientError> {
//! let client = ApiClient::new(ClientConfig::new("http://localhost:8000/api")?)?;
//! let messages = client.get_messages(&ConversationId::from("conv-1")).await?;
//! println!("{} messages", messages.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use store::MessageStore;
