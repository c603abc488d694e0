// Library root
// -----------
// The binary (`main.rs`) parses flags, loads configuration and hands an
// `ApiClient` to the UI layer.
//
// Module responsibilities:
// - `api`: HTTP interactions with the CANTAB subject service (lookup,
//   registration, access codes) and redirect URL construction.
// - `model`: JSON shapes exchanged with the service.
// - `pipeline`: subject identifier to URL, single or batch.
// - `config`: config file, environment and flag layering.
// - `ui`: terminal prompts, progress and result printing.
// - `cli`, `logging`, `error`: flags, tracing setup and the error type.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod ui;

pub use api::{ApiClient, HttpTransport, RawResponse, Transport};
pub use config::{Config, ServiceConfig, Settings, StudySettings};
pub use error::CamcogError;
