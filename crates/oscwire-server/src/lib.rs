//! oscwire Server
//!
//! Turns received datagrams into routed messages:
//! - [`Dispatcher`]: packet queue, sender allow-list, pattern bindings
//! - [`OscServer`]: a UDP receiver wired to a dispatcher
//!
//! # Example
//!
//! ```no_run
//! use oscwire_server::{OscServer, ServerConfig};
//!
//! let mut server = OscServer::new(ServerConfig::default())?;
//! server.bind_path("/mixer/*/volume", |msg| {
//!     println!("{} -> {:?}", msg.address(), msg.float_at(0));
//! })?;
//! server.listen()?;
//! loop {
//!     server.pump();
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), oscwire_server::ServerError>(())
//! ```

pub mod allow_list;
pub mod bindings;
pub mod dispatcher;
pub mod error;
pub mod server;

pub use allow_list::AllowList;
pub use bindings::{Handler, HandlerId};
pub use dispatcher::{Dispatcher, PacketSink, DEFAULT_QUEUE_CAPACITY};
pub use error::{Result, ServerError};
pub use server::{OscServer, ServerConfig};
