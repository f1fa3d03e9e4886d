//! Reactive variable-resolution and request-templating engine.
//!
//! This crate keeps a shared pool of named values fed from user input, SQL
//! query results, and prior HTTP responses; derives additional values via
//! declarative condition lookups and formula expressions with dependency
//! tracking; and resolves template strings (URLs, headers, JSON bodies,
//! path expressions) against that pool to build outgoing requests.
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//!
//! - **pool**: Central name-to-value store with change reporting
//! - **config**: Per-product configuration documents (layout, interfaces, SQL)
//! - **template**: Multi-phase placeholder substitution, including
//!   array-index and date/random macro placeholders
//! - **condition**: Derived variables chosen via a combo-keyed mapping table
//! - **formula**: Derived numeric/date variables with dependency scanning
//! - **extract**: Multi-hop path extraction from response bodies
//! - **body**: Request body/header/URL construction with type coercion
//! - **session**: Pool + config + dependency graph + reactive recompute
//! - **exec**: Traits for the external HTTP and SQL collaborators
//! - **models**: Resolved requests and exchange responses
//!
//! # Data Flow
//!
//! UI inputs, SQL outputs, and response extraction write into the pool via
//! [`session::Session`]; every write recomputes transitively affected
//! conditions and formulas in dependency order; template resolution consumes
//! the pool to materialize a [`models::ResolvedRequest`]; the external HTTP
//! collaborator executes it; response mapping writes extracted values back
//! into the pool, restarting the cycle.
//!
//! # Usage
//!
//! ```
//! use apiforge::config::parse_product_config;
//! use apiforge::session::Session;
//!
//! let config = parse_product_config(r#"{
//!     "layout": [
//!         {"type": "field", "key": "userId", "default": "42"},
//!         {"type": "formula", "key": "double", "formula": "{userId}*2"}
//!     ],
//!     "interfaces": {
//!         "get_user": {
//!             "method": "GET",
//!             "url": "https://api.example.com/users/{userId}"
//!         }
//!     }
//! }"#).unwrap();
//!
//! let mut session = Session::new(config);
//! assert_eq!(session.pool().get_str("double"), Some("84".to_string()));
//!
//! let request = session.prepare_request("get_user").unwrap();
//! assert_eq!(request.url, "https://api.example.com/users/42");
//! ```
//!
//! The engine itself performs no I/O; HTTP and SQL run behind the traits in
//! [`exec`], and all of the above executes on the single owning thread.

pub mod body;
pub mod condition;
pub mod config;
pub mod exec;
pub mod extract;
pub mod formula;
pub mod models;
pub mod pool;
pub mod session;
pub mod template;

pub use config::{load_product_config, parse_product_config, ConfigError, ProductConfig};
pub use models::{ExchangeResponse, ResolvedRequest};
pub use pool::{Provenance, VariableChange, VariablePool};
pub use session::Session;
pub use template::{resolve, ResolveContext, ReservedValues};
