//! # Ping Uploader - durable telemetry ping delivery
//!
//! Moves serialized pings from a local pending directory to a collection
//! endpoint over HTTP. A ping is deleted once the server accepts it or
//! permanently rejects it; on any transient failure the file stays on disk
//! and is picked up by the next pass. A crash mid-pass therefore never loses
//! a ping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ping_uploader::{QueueProcessor, UploaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploaderConfig::new("/var/lib/myapp/telemetry", "https://incoming.example.com")?
//!     .with_user_agent("myapp/1.0")
//!     .with_sdk_version("1.0.0");
//!
//! let processor = QueueProcessor::with_http(config)?;
//! let stats = processor.process().await;
//! println!("uploaded {} pings", stats.uploaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`directory`**: finds pending ping files and validates their names
//! - **`codec`**: the on-disk ping file format
//! - **`transport`**: the network capability, with a `reqwest` implementation
//! - **`client`**: builds requests and classifies responses into dispositions
//! - **`policy`**: decides whether a ping file is deleted or kept
//! - **`processor`**: runs a pass over the pending directory
//! - **`worker`**: optional periodic driver for passes

pub mod client;
pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod policy;
pub mod processor;
pub mod transport;
pub mod worker;

pub use client::{UploadAttempt, UploadClient, UploadDisposition};
pub use codec::{CorruptPingFile, PingPayload};
pub use config::{CorruptFilePolicy, UploaderConfig};
pub use directory::{is_valid_ping_file_name, PendingEntry, PingDirectory};
pub use error::{UploadError, UploadResult};
pub use policy::{PolicyDecision, UploadPolicy};
pub use processor::{FileOutcome, ProcessStats, QueueProcessor};
pub use transport::{HttpTransport, Transport, UploadRequest};
pub use worker::{UploadWorker, WorkerStats};
