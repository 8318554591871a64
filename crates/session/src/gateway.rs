//! Authenticated API calls with a single retry after a rejected token

use crate::auth::SessionContext;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokenward_http::{ApiClient, ApiRequest, ClientError, Transport};

/// Sends API requests on behalf of a session
///
/// Every request carries a fresh access token. When the server still answers 401, the
/// token is renewed and the identical request is sent one more time.
#[derive(Clone)]
pub struct RequestGateway<T = ApiClient> {
    session: SessionContext,
    transport: T,
}

impl<T: Transport> RequestGateway<T> {
    pub fn new(session: SessionContext, transport: T) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and return the JSON body
    pub async fn send(&self, request: &ApiRequest) -> Result<Value, ClientError> {
        let Some(token) = self.session.get_valid_access_token().await else {
            debug!(path = %request.path, "No session; not sending request");
            return Err(ClientError::NotAuthenticated);
        };

        match self.transport.send(request, Some(&token)).await {
            Err(err) if err.is_auth_failure() => {
                self.retry_after_refresh(request, &token, err).await
            }
            result => result,
        }
    }

    async fn retry_after_refresh(
        &self,
        request: &ApiRequest,
        rejected: &str,
        original: ClientError,
    ) -> Result<Value, ClientError> {
        debug!(path = %request.path, "Access token rejected; renewing");

        // Another call may already have replaced the rejected token
        let renewed = match self.session.access_token() {
            Some(current) if current != rejected && !self.session.is_refreshing() => current,
            _ => match self.session.refresh().await {
                Ok(pair) => pair.access,
                Err(err) => {
                    warn!(path = %request.path, error = %err, "Renewal after rejection failed");
                    return Err(original);
                }
            },
        };

        let result = self.transport.send(request, Some(&renewed)).await;
        if let Err(err) = &result {
            if err.is_auth_failure() {
                warn!(path = %request.path, "Request rejected again after renewal");
            }
        }
        result
    }

    /// Send `request` and deserialize the JSON body
    pub async fn execute<R: DeserializeOwned>(&self, request: &ApiRequest) -> Result<R, ClientError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.execute(&ApiRequest::get(path)).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(&ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.execute(&ApiRequest::delete(path)).await
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::storage::MemoryTokenStore;
    use crate::test_support::{StaticIssuer, identity, token};
    use async_trait::async_trait;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tokenward_core::TokenPair;

    /// Transport replaying scripted answers and recording the bearer of each call
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        answers: Rc<RefCell<VecDeque<Result<Value, ClientError>>>>,
        bearers: Rc<RefCell<Vec<Option<String>>>>,
    }

    impl ScriptedTransport {
        fn answering(answers: Vec<Result<Value, ClientError>>) -> Self {
            Self {
                answers: Rc::new(RefCell::new(answers.into())),
                ..Self::default()
            }
        }

        fn bearers(&self) -> Vec<Option<String>> {
            self.bearers.borrow().clone()
        }
    }

    #[async_trait(?Send)]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            bearer: Option<&str>,
        ) -> Result<Value, ClientError> {
            self.bearers.borrow_mut().push(bearer.map(str::to_owned));
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn rejected() -> Result<Value, ClientError> {
        Err(ClientError::AuthenticationFailed("Token is invalid or expired".into()))
    }

    fn logged_in(issuer: StaticIssuer, access: &str) -> SessionContext {
        let session =
            SessionContext::create(SessionConfig::default(), MemoryTokenStore::default(), issuer);
        session
            .login(TokenPair::new(access, "refresh-1"), identity())
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_anonymous_request_is_not_sent() {
        let session = SessionContext::create(
            SessionConfig::default(),
            MemoryTokenStore::default(),
            StaticIssuer::default(),
        );
        let transport = ScriptedTransport::default();
        let gateway = RequestGateway::new(session, transport.clone());

        let result = gateway.send(&ApiRequest::get("/api/items/")).await;

        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
        assert!(transport.bearers().is_empty());
    }

    #[tokio::test]
    async fn test_success_passes_body_through() {
        let access = token(3600);
        let transport = ScriptedTransport::answering(vec![Ok(json!({ "id": 7 }))]);
        let gateway = RequestGateway::new(logged_in(StaticIssuer::default(), &access), transport.clone());

        let body = gateway.send(&ApiRequest::get("/api/items/7/")).await.unwrap();

        assert_eq!(body, json!({ "id": 7 }));
        assert_eq!(transport.bearers(), vec![Some(access)]);
    }

    #[tokio::test]
    async fn test_rejection_is_retried_once_with_renewed_token() {
        let access = token(3600);
        let renewed = token(7200);
        let issuer = StaticIssuer {
            access: Some(renewed.clone()),
            ..StaticIssuer::default()
        };
        let calls = issuer.calls();
        let transport = ScriptedTransport::answering(vec![rejected(), Ok(json!("ok"))]);
        let gateway = RequestGateway::new(logged_in(issuer, &access), transport.clone());

        let body = gateway.send(&ApiRequest::get("/api/items/")).await.unwrap();

        assert_eq!(body, json!("ok"));
        assert_eq!(calls.get(), 1);
        assert_eq!(transport.bearers(), vec![Some(access), Some(renewed)]);
    }

    /// Transport on which another caller renews the session while the first request is
    /// being rejected
    struct RenewingTransport {
        session: SessionContext,
        bearers: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl Transport for RenewingTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            bearer: Option<&str>,
        ) -> Result<Value, ClientError> {
            let first = {
                let mut bearers = self.bearers.borrow_mut();
                bearers.push(bearer.unwrap_or_default().to_owned());
                bearers.len() == 1
            };
            if first {
                self.session.refresh().await.unwrap();
                return rejected();
            }
            Ok(json!("ok"))
        }
    }

    #[tokio::test]
    async fn test_rejection_reuses_token_renewed_by_another_call() {
        let access = token(3600);
        let renewed = token(7200);
        let issuer = StaticIssuer {
            access: Some(renewed.clone()),
            ..StaticIssuer::default()
        };
        let calls = issuer.calls();
        let session = logged_in(issuer, &access);
        let transport = RenewingTransport {
            session: session.clone(),
            bearers: RefCell::default(),
        };
        let gateway = RequestGateway::new(session, transport);

        let body = gateway.send(&ApiRequest::get("/api/items/")).await.unwrap();

        assert_eq!(body, json!("ok"));
        assert_eq!(calls.get(), 1);
        assert_eq!(*gateway.transport().bearers.borrow(), vec![access, renewed]);
    }

    #[tokio::test]
    async fn test_second_rejection_is_not_retried() {
        let issuer = StaticIssuer {
            access: Some(token(7200)),
            ..StaticIssuer::default()
        };
        let transport = ScriptedTransport::answering(vec![rejected(), rejected(), Ok(json!("ok"))]);
        let gateway = RequestGateway::new(logged_in(issuer, &token(3600)), transport.clone());

        let result = gateway.send(&ApiRequest::get("/api/items/")).await;

        assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
        assert_eq!(transport.bearers().len(), 2);
        assert_eq!(gateway.session().authenticated(), Some(true));
    }

    #[tokio::test]
    async fn test_failed_renewal_returns_original_rejection() {
        let transport = ScriptedTransport::answering(vec![Err(
            ClientError::AuthenticationFailed("original".into()),
        )]);
        let gateway = RequestGateway::new(logged_in(StaticIssuer::default(), &token(3600)), transport.clone());

        let result = gateway.send(&ApiRequest::get("/api/items/")).await;

        match result {
            Err(ClientError::AuthenticationFailed(message)) => assert_eq!(message, "original"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(transport.bearers().len(), 1);
        assert_eq!(gateway.session().authenticated(), Some(false));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let transport = ScriptedTransport::answering(vec![Err(ClientError::Forbidden("no".into()))]);
        let gateway = RequestGateway::new(logged_in(StaticIssuer::default(), &token(3600)), transport.clone());

        let result = gateway.send(&ApiRequest::get("/api/items/")).await;

        assert!(matches!(result, Err(ClientError::Forbidden(_))));
        assert_eq!(transport.bearers().len(), 1);
    }

    #[tokio::test]
    async fn test_typed_helpers_decode_body() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: u32,
        }

        let transport = ScriptedTransport::answering(vec![Ok(json!({ "id": 3 })), Ok(Value::Null)]);
        let gateway = RequestGateway::new(logged_in(StaticIssuer::default(), &token(3600)), transport);

        let item: Item = gateway.post("/api/items/", &json!({ "name": "x" })).await.unwrap();
        assert_eq!(item, Item { id: 3 });

        let deleted: Option<Item> = gateway.delete("/api/items/3/").await.unwrap();
        assert_eq!(deleted, None);
    }
}
