pub mod action;
pub mod builtin;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod object;
pub mod params;
pub mod registry;
pub mod types;

pub use action::{Action, FnAction};
pub use endpoint::{ActionRequest, ActionsEndpoint};
pub use error::{ActiondError, RequestError, Result};
pub use filter::{FilterEngine, FilterError, QueryDescription, StoreFilterEngine};
pub use object::{ConfigObject, ObjectStore};
pub use params::ParameterSet;
pub use registry::{ActionLookup, ActionRegistry};
pub use types::{Envelope, FailureRecord, ResultEntry, Target};
