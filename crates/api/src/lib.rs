//! REST client for the Crucible code review server.
//!
//! [`CrucibleClient`] is the endpoint catalog. Underneath it,
//! [`UriBuilder`] renders request targets, [`RequestDispatcher`] performs
//! single HTTP exchanges through a [`Transport`], and every response comes
//! back as a [`ResponseEnvelope`].

pub mod client;
pub mod crucible;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod response;
pub mod transport;
pub mod uri;

pub use client::{ClientConfig, Credentials};
pub use crucible::{ChangeSetSearch, CrucibleClient, RepositorySearch, ReviewSearch};
pub use dispatch::RequestDispatcher;
pub use error::{ApiError, Result};
pub use response::{Failure, Outcome, ResponseEnvelope};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse, Upload, UploadStream};
pub use uri::{QueryValue, ResourceRoot, UriBuilder};
