use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

#[cfg(not(test))]
use {
    crate::Error,
    std::net::{IpAddr, SocketAddr},
    std::sync::Arc,
    tower_governor::{governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorLayer},
};

use crate::api::{
    auth, extract::USER_ID_HEADER, handlers, interactions, recipes, recommendations, search,
    uploads, users, AppContext,
};
use crate::realtime;
use crate::Result;

/// Build the application router: every route group once, then the shared middleware
pub fn create_router(ctx: &AppContext) -> Result<Router> {
    let settings = &ctx.settings;

    // JSON route groups, in registration order
    #[cfg_attr(test, allow(unused_mut))]
    let mut api_routes = Router::new()
        .merge(auth::routes(ctx))
        .merge(recipes::routes(ctx))
        .merge(search::router(ctx))
        .merge(users::routes(ctx))
        .merge(interactions::routes(ctx))
        .merge(recommendations::routes(ctx))
        .layer(RequestBodyLimitLayer::new(
            settings.server.max_request_body_size,
        ));

    // Rate limiting needs the peer address, which only the real server provides
    #[cfg(not(test))]
    {
        #[derive(Clone, Copy, Debug)]
        struct FallbackIpKeyExtractor;

        impl KeyExtractor for FallbackIpKeyExtractor {
            type Key = IpAddr;

            fn extract<B>(
                &self,
                req: &axum::http::Request<B>,
            ) -> std::result::Result<Self::Key, tower_governor::GovernorError> {
                if let Some(axum::extract::ConnectInfo(addr)) =
                    req.extensions().get::<axum::extract::ConnectInfo<SocketAddr>>()
                {
                    return Ok(addr.ip());
                }

                Ok(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
            }
        }

        let rate = settings.server.api_rate_limit.max(1);
        let governor_conf = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_millisecond((1000 / rate).max(1))
            .burst_size(u32::try_from(rate * 2).unwrap_or(u32::MAX))
            .finish()
            .ok_or_else(|| Error::Config("Invalid API_RATE_LIMIT".to_string()))?;

        api_routes = api_routes.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        });
    }

    let health_routes = Router::new()
        .route("/hello", get(handlers::hello))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(ctx.clone());

    let realtime_routes = Router::new()
        .route("/ws", get(realtime::ws_handler))
        .with_state(ctx.realtime.clone());

    let router = Router::new()
        .merge(api_routes)
        .merge(uploads::routes(ctx))
        .merge(health_routes)
        .merge(realtime_routes)
        .layer(
            // Any origin, including for the WebSocket endpoint
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static(USER_ID_HEADER),
                ])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
