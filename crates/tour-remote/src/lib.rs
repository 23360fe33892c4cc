//! # tour-remote
//!
//! Client side of the hosted backend: resolving the current metadata of a
//! stored document (row lookup + signed access URL) and probing whether the
//! backend is reachable at all.
//!
//! ## Example
//!
//! ```ignore
//! use tour_remote::{ConnectivityProbe, RestDocumentResolver};
//!
//! let remote = config.require_remote()?;
//! let resolver = RestDocumentResolver::new(remote)?;
//! let metadata = resolver.resolve(&DocumentId::from("doc-1")).await?;
//!
//! let probe = ConnectivityProbe::new(remote, config.connectivity.probe_interval())?;
//! observer.run(probe.into_stream()).await;
//! ```

pub mod error;
pub mod probe;
pub mod resolver;

pub use error::{RemoteError, RemoteResult};
pub use probe::ConnectivityProbe;
pub use resolver::RestDocumentResolver;
