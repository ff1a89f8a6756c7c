#![allow(dead_code)]

use std::sync::Arc;

use academics::auth::UnconfiguredAuthHandler;
use academics::repo::inmem::InMemRepo;
use academics::AppState;
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;

/// Fresh in-memory state with no identity service behind `/api/auth`.
pub fn state() -> AppState {
    AppState { repo: Arc::new(InMemRepo::new()), auth: Arc::new(UnconfiguredAuthHandler) }
}

pub async fn json<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    let body = actix_web::test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap()
}
