//! Shared-secret middleware for Actix Web.
//!
//! Scheduled jobs such as the settlement sweep are triggered by an external scheduler (cron, a cloud scheduler, etc.)
//! rather than by a logged-in user. The scheduler presents a pre-shared secret in the `X-Sweep-Secret` header, and
//! this middleware compares it with the configured value before letting the request through.
//!
//! If no secret is configured, every request is denied.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use washroute_common::Secret;

pub const SWEEP_SECRET_HEADER: &str = "x-sweep-secret";

pub struct SharedSecretMiddlewareFactory {
    header: String,
    secret: Option<Secret<String>>,
}

impl SharedSecretMiddlewareFactory {
    pub fn new(header: &str, secret: Option<Secret<String>>) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        SharedSecretMiddlewareFactory { header: header.into(), secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SharedSecretMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SharedSecretMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SharedSecretMiddlewareService {
            header: self.header.clone(),
            secret: self.secret.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct SharedSecretMiddlewareService<S> {
    header: String,
    secret: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SharedSecretMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.secret.as_ref().map(|s| s.reveal().clone());
        let header = self.header.clone();
        Box::pin(async move {
            trace!("🔐️ Checking shared secret for {}", req.path());
            let Some(expected) = expected else {
                warn!("🔐️ No shared secret is configured for {}. Denying access.", req.path());
                return Err(ErrorForbidden("This endpoint is disabled."));
            };
            let provided = req.headers().get(&header).and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No shared secret found in request to {}. Denying access.", req.path());
                ErrorUnauthorized("No shared secret provided.")
            })?;
            if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
                trace!("🔐️ Shared secret check for request ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid shared secret found in request to {}. Denying access.", req.path());
                Err(ErrorForbidden("Invalid shared secret."))
            }
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
