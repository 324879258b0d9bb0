//! HTTP bridge from endpoint bindings to bus requests
//!
//! Every [`Endpoint`] recorded on the bus becomes an axum route. An incoming
//! call is turned into a [`Request`] addressed to the bound channel and method
//! whose payload merges, in increasing priority:
//! - query string parameters
//! - the JSON body (an object is merged field by field)
//! - path parameters
//!
//! A successful response is returned as JSON with 200. Any failure, including a
//! middleware rejection, is answered with 500 and `{error}`.
//!
//! Routes are taken from a snapshot of the bus when the router is built.

use crate::bus::{Address, Endpoint, EventBus, HttpMethod, Message, Request};
use crate::core::error::{BusError, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;

/// Routes reserved by the server itself
const RESERVED_ROUTES: &[&str] = &["/health"];

/// Build a router exposing every endpoint currently bound on the bus
pub fn endpoint_routes(bus: &EventBus) -> Router {
    // Group bindings by route; axum needs one method router per path
    let mut groups: Vec<(String, Vec<Endpoint>)> = Vec::new();

    for endpoint in bus.endpoints() {
        if !endpoint.route.starts_with('/') || RESERVED_ROUTES.contains(&endpoint.route.as_str()) {
            tracing::warn!(
                route = %endpoint.route,
                address = %endpoint.address,
                "Skipping endpoint with unusable route"
            );
            continue;
        }

        match groups.iter_mut().find(|(route, _)| *route == endpoint.route) {
            Some((_, bound)) if bound.iter().any(|e| e.http_method == endpoint.http_method) => {
                tracing::warn!(
                    route = %endpoint.route,
                    http_method = %endpoint.http_method,
                    address = %endpoint.address,
                    "Route already bound for this method, skipping"
                );
            }
            Some((_, bound)) => bound.push(endpoint),
            None => groups.push((endpoint.route.clone(), vec![endpoint])),
        }
    }

    groups.into_iter().fold(Router::new(), |router, (route, bound)| {
        let method_router = bound.iter().fold(MethodRouter::new(), |method_router, endpoint| {
            tracing::info!(
                http_method = %endpoint.http_method,
                route = %endpoint.route,
                address = %endpoint.address,
                "Mounted bus endpoint"
            );
            mount(method_router, endpoint, bus.clone())
        });
        router.route(&route, method_router)
    })
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// Add a handler forwarding `endpoint`'s method to its bus address
fn mount(method_router: MethodRouter, endpoint: &Endpoint, bus: EventBus) -> MethodRouter {
    let address = endpoint.address.clone();

    method_router.on(
        method_filter(endpoint.http_method),
        move |path: Option<Path<HashMap<String, String>>>,
              query: Option<Query<HashMap<String, String>>>,
              body: Bytes| {
            let bus = bus.clone();
            let address = address.clone();
            async move {
                let params = path.map(|Path(p)| p).unwrap_or_default();
                let query = query.map(|Query(q)| q).unwrap_or_default();

                match build_request(&address, query, &body, params) {
                    Ok(request) => respond(bus.request(request).await),
                    Err(e) => e.into_response(),
                }
            }
        },
    )
}

/// Merge the HTTP inputs into one request for `address`
pub fn build_request(
    address: &Address,
    query: HashMap<String, String>,
    body: &[u8],
    params: HashMap<String, String>,
) -> Result<Request> {
    let mut request = Message::new(address.channel.clone(), address.method.clone());

    for (key, value) in query {
        request.insert(key, Value::String(value));
    }

    if !body.iter().all(u8::is_ascii_whitespace) {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    request.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                return Err(BusError::SerializationError(format!(
                    "request body must be a JSON object, got {}",
                    other
                )));
            }
        }
    }

    for (key, value) in params {
        request.insert(key, Value::String(value));
    }

    Ok(request)
}

fn respond(result: Result<Value>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => e.into_response(),
    }
}
