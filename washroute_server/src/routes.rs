//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) should be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use washroute_engine::{LedgerDatabase, OrderFlowApi, SettlementApi, WebhookApi};

use crate::{
    config::ServerOptions,
    data_objects::WebhookResponse,
    errors::ServerError,
    settlement_worker::run_sweep,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Gateway webhooks  ---------------------------------------------
route!(gateway_webhook => Post "/webhook" impl LedgerDatabase);
/// Route handler for payment gateway webhooks.
///
/// The signature is checked over the raw request body, so the body is taken as bytes and only parsed once the
/// signature has been verified. The header that carries the signature is configurable (`WRS_SIGNATURE_HEADER`).
///
/// Every event that passes the signature check gets a 200 response, whether it was applied, was a replay, or was
/// discarded. Anything else would make the gateway retry an event that can never succeed.
/// * A missing or invalid signature returns 401.
/// * A body that is not a valid event returns 400.
pub async fn gateway_webhook<B: LedgerDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received gateway webhook ({} bytes)", body.len());
    let signature = req.headers().get(options.signature_header.as_str()).and_then(|v| v.to_str().ok());
    let outcome = api.handle_signed_event(body.as_ref(), signature).await.map_err(|e| {
        debug!("💻️ Could not handle gateway webhook. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Gateway webhook handled. {outcome}");
    Ok(HttpResponse::Ok().json(WebhookResponse::from(outcome)))
}

//------------------------------------------   Scheduled jobs  ---------------------------------------------
route!(settlement_sweep => Post "/settlement_sweep" impl LedgerDatabase);
/// Runs the settlement sweep on demand.
///
/// This is the same job the in-process settlement worker runs on a timer. It lives in the `/jobs` scope, which is
/// guarded by the shared-secret middleware, so an external scheduler can trigger it instead.
pub async fn settlement_sweep<B: LedgerDatabase>(
    options: web::Data<ServerOptions>,
    settlement: web::Data<SettlementApi<B>>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received settlement sweep request");
    let summary = run_sweep(settlement.as_ref(), orders.as_ref(), options.as_ref()).await.map_err(|e| {
        warn!("💻️ Settlement sweep failed. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Settlement sweep complete. {summary}");
    Ok(HttpResponse::Ok().json(summary))
}
