use crate::helper::credential_helpers::TokenService;
use crate::helper::principal_helpers;
use crate::helper::PortalError;
use crate::models::{AdminUser, Client};
use crate::DbPool;
use actix_web::{dev, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// The client resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub Client);

/// The admin resolved from the request's bearer token. Role is not checked.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub AdminUser);

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn auth_state(req: &HttpRequest) -> Result<(&DbPool, &TokenService), PortalError> {
    let pool = req
        .app_data::<web::Data<DbPool>>()
        .ok_or_else(|| PortalError::Internal("database pool not registered".to_string()))?;
    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| PortalError::Internal("token service not registered".to_string()))?;
    Ok((pool.get_ref(), tokens.get_ref()))
}

impl FromRequest for AuthenticatedClient {
    type Error = PortalError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let result = auth_state(req).and_then(|(pool, tokens)| {
            let token = bearer_token(req).ok_or(PortalError::Unauthenticated)?;
            principal_helpers::resolve_client(pool, tokens, token).map(AuthenticatedClient)
        });
        ready(result)
    }
}

impl FromRequest for AuthenticatedAdmin {
    type Error = PortalError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let result = auth_state(req).and_then(|(pool, tokens)| {
            let token = bearer_token(req).ok_or(PortalError::Unauthenticated)?;
            principal_helpers::resolve_admin(pool, tokens, token).map(AuthenticatedAdmin)
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_token_is_extracted() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));

        let lower = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "bearer xyz"))
            .to_http_request();
        assert_eq!(bearer_token(&lower), Some("xyz"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "Bearer", "token"] {
            let req = TestRequest::default()
                .insert_header((header::AUTHORIZATION, value))
                .to_http_request();
            assert_eq!(bearer_token(&req), None, "{value}");
        }
        assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
    }
}
