//! The dispatch step between request and response interceptors.

use http::Method;
use tokio_util::sync::CancellationToken;

use courier_core::headers::{FORM_URLENCODED, normalize, set_content_type_if_absent};

use super::ResponseFuture;
use crate::adapter::{SharedAdapter, defaults};
use crate::cancel::CanceledError;
use crate::config::RequestConfig;
use crate::error::Error;
use crate::transform::{transform_request_data, transform_response_data};

/// Fail if cancellation was requested through the token or the signal.
fn throw_if_cancellation_requested(config: &RequestConfig) -> Result<(), Error> {
    if let Some(token) = &config.cancel_token {
        token.throw_if_requested()?;
    }
    if config
        .signal
        .as_ref()
        .is_some_and(CancellationToken::is_cancelled)
    {
        return Err(CanceledError::new(None).with_config(config.clone()).into());
    }
    Ok(())
}

/// Prepare `config`, invoke the adapter and shape its outcome.
///
/// Everything up to and including the adapter call happens before this
/// function returns; an `Err` means the call failed before reaching the
/// adapter. The returned future applies the response side.
///
/// The adapter is `config.adapter`, else `fallback`, else the process-wide
/// default.
pub fn dispatch_request(
    mut config: RequestConfig,
    fallback: Option<SharedAdapter>,
) -> Result<ResponseFuture, Error> {
    throw_if_cancellation_requested(&config)?;

    let method = config.method_or_default();
    config.headers.normalize(&method);
    transform_request_data(&mut config)?;

    if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        set_content_type_if_absent(config.headers.flat_mut(), FORM_URLENCODED);
    }

    let adapter = config
        .adapter
        .clone()
        .or(fallback)
        .unwrap_or_else(|| defaults().adapter.clone());
    let pending = adapter.send(config.clone());

    Ok(Box::pin(async move {
        match pending.await {
            Ok(mut response) => {
                throw_if_cancellation_requested(&config)?;
                transform_response_data(&config, &mut response)?;
                normalize(&mut response.headers);
                Ok(response)
            }
            Err(err) if err.is_cancel() => Err(err),
            Err(mut err) => {
                throw_if_cancellation_requested(&config)?;
                if let Some(response) = err.response_mut() {
                    transform_response_data(&config, response)?;
                    normalize(&mut response.headers);
                }
                Err(err)
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use courier_core::Data;
    use courier_core::headers::APPLICATION_JSON;
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    use crate::adapter::adapter_fn;
    use crate::cancel::CancelToken;
    use crate::error::{AdapterError, AdapterErrorKind};
    use crate::response::Response;

    fn echo() -> SharedAdapter {
        Arc::new(adapter_fn(|config: RequestConfig| async move {
            Ok(Response::new(StatusCode::OK, config))
        }))
    }

    #[tokio::test]
    async fn test_sends_transformed_request() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let adapter: SharedAdapter = Arc::new(adapter_fn(move |config: RequestConfig| {
            *captured.lock().unwrap() = Some(config.clone());
            async move { Ok(Response::new(StatusCode::OK, config)) }
        }));

        let config = RequestConfig::new()
            .method(Method::POST)
            .header("x-pad", "  padded  ")
            .data(json!({"a": 1}));
        dispatch_request(config, Some(adapter)).unwrap().await.unwrap();

        let sent = seen.lock().unwrap().clone().unwrap();
        assert_eq!(sent.data, Some(Data::Text(r#"{"a":1}"#.into())));
        assert_eq!(sent.headers.flat().get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(sent.headers.flat().get("x-pad").unwrap(), "padded");
    }

    #[tokio::test]
    async fn test_form_urlencoded_default_for_text_post() {
        let config = RequestConfig::new().method(Method::PUT).data("a=1");
        let response = dispatch_request(config, Some(echo())).unwrap().await.unwrap();
        assert_eq!(
            response.config.headers.flat().get(CONTENT_TYPE).unwrap(),
            FORM_URLENCODED
        );

        let config = RequestConfig::new().data("a=1");
        let response = dispatch_request(config, Some(echo())).unwrap().await.unwrap();
        assert!(response.config.headers.flat().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_config_adapter_overrides_fallback() {
        let fallback: SharedAdapter = Arc::new(adapter_fn(|_config: RequestConfig| async move {
            Err(Error::adapter(AdapterErrorKind::Other, "fallback used"))
        }));
        let config = RequestConfig::new().shared_adapter(echo());
        let response = dispatch_request(config, Some(fallback)).unwrap().await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn test_signal_checked_before_adapter() {
        let signal = CancellationToken::new();
        signal.cancel();
        let err = match dispatch_request(RequestConfig::new().signal(signal), Some(echo())) {
            Err(err) => err,
            Ok(_) => panic!("expected prelude failure"),
        };
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "canceled");
    }

    #[tokio::test]
    async fn test_cancel_during_flight_rejects_success() {
        let source = CancelToken::source();
        let cancel = source.cancel.clone();
        let adapter: SharedAdapter = Arc::new(adapter_fn(move |config: RequestConfig| {
            let cancel = cancel.clone();
            async move {
                cancel.cancel("mid-flight");
                Ok(Response::new(StatusCode::OK, config))
            }
        }));

        let config = RequestConfig::new().cancel_token(source.token.clone());
        let err = dispatch_request(config, Some(adapter))
            .unwrap()
            .await
            .unwrap_err();
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "mid-flight");
    }

    #[tokio::test]
    async fn test_partial_response_transformed_before_rejecting() {
        let adapter: SharedAdapter = Arc::new(adapter_fn(|config: RequestConfig| async move {
            let mut headers = http::HeaderMap::new();
            headers.insert(CONTENT_TYPE, APPLICATION_JSON.parse().unwrap());
            headers.insert("x-trim", " v ".parse().unwrap());
            let response = Response::new(StatusCode::NOT_FOUND, config)
                .with_headers(headers)
                .with_data(r#"{"error":"missing"}"#);
            Err(Error::from(
                AdapterError::new(AdapterErrorKind::BadRequest, "Request failed with status code 404")
                    .with_response(response),
            ))
        }));

        let err = dispatch_request(RequestConfig::new(), Some(adapter))
            .unwrap()
            .await
            .unwrap_err();

        let response = err.response().unwrap();
        assert_eq!(response.data, Some(Data::Json(json!({"error": "missing"}))));
        assert_eq!(response.headers.get("x-trim").unwrap(), "v");
    }

    #[tokio::test]
    async fn test_adapter_cancel_passes_through() {
        let adapter: SharedAdapter = Arc::new(adapter_fn(|_config: RequestConfig| async move {
            Err(Error::Canceled(CanceledError::new(Some("from adapter".into()))))
        }));

        let err = dispatch_request(RequestConfig::new(), Some(adapter))
            .unwrap()
            .await
            .unwrap_err();
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "from adapter");
    }
}
