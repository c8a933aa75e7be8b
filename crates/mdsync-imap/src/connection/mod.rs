//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction with STARTTLS upgrade
//! - Framed I/O for IMAP protocol
//! - Type-state connection wrapper

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, Security};
pub use framed::{FramedStream, ResponseAccumulator, is_tagged_response};
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};
