//! Operation dispatch.
//!
//! Every operation is registered together with its role declaration, so
//! the dispatcher can resolve, decide, and only then execute.

mod registry;

pub use registry::{
    DispatchError, InvalidArguments, OperationFuture, OperationHandler, OperationRegistry,
    parse_args,
};

// Operation handler implementations
mod probes;
mod profile;

pub use probes::{PingHandler, RoleGateHandler};
pub use profile::{EditProfileHandler, MeHandler, VerifyEmailHandler};
