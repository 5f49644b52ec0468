mod shared_secret;

pub use shared_secret::{SharedSecretMiddlewareFactory, SharedSecretMiddlewareService, SWEEP_SECRET_HEADER};
