//! Request and response data transforms.
//!
//! Transforms run inside the dispatch step: request transforms just before
//! the adapter is called, response transforms on whatever the adapter
//! produced (including partial responses attached to adapter errors).

use std::sync::Arc;

use http::HeaderMap;

use courier_core::Data;
use courier_core::headers::{APPLICATION_JSON, is_json_content_type, set_content_type_if_absent};

use crate::config::{RequestConfig, RequestTransform, ResponseTransform, TransformContext};
use crate::error::Error;
use crate::response::Response;

/// Built-in request transforms: serialize JSON data.
pub fn default_request_transforms() -> Vec<RequestTransform> {
    let serialize: RequestTransform = Arc::new(serialize_json);
    vec![serialize]
}

/// Built-in response transforms: parse JSON bodies.
pub fn default_response_transforms() -> Vec<ResponseTransform> {
    let parse: ResponseTransform = Arc::new(parse_json);
    vec![parse]
}

fn serialize_json(
    data: Option<Data>,
    headers: &mut HeaderMap,
    _ctx: &TransformContext<'_>,
) -> Result<Option<Data>, Error> {
    match data {
        Some(Data::Json(value)) => {
            set_content_type_if_absent(headers, APPLICATION_JSON);
            let text = serde_json::to_string(&value).map_err(|e| Error::transform(e.to_string()))?;
            Ok(Some(Data::Text(text)))
        }
        other => Ok(other),
    }
}

fn parse_json(
    data: Option<Data>,
    headers: &HeaderMap,
    ctx: &TransformContext<'_>,
) -> Result<Option<Data>, Error> {
    let Some(data) = data else {
        return Ok(None);
    };
    let json_requested = is_json_content_type(headers);
    if !json_requested && !ctx.transitional.is_forced_json_parsing() {
        return Ok(Some(data));
    }

    let parsed = match &data {
        Data::Json(_) => return Ok(Some(data)),
        Data::Text(text) if !text.is_empty() => serde_json::from_str(text),
        Data::Bytes(bytes) if !bytes.is_empty() => serde_json::from_slice(bytes),
        _ => return Ok(Some(data)),
    };

    match parsed {
        Ok(value) => Ok(Some(Data::Json(value))),
        Err(err) if json_requested && !ctx.transitional.is_silent_json_parsing() => {
            Err(Error::transform(format!("invalid JSON response body: {err}")))
        }
        Err(_) => Ok(Some(data)),
    }
}

/// Run the configured request transforms over `config.data`.
pub fn transform_request_data(config: &mut RequestConfig) -> Result<(), Error> {
    let transforms = config
        .transform_request
        .clone()
        .unwrap_or_else(default_request_transforms);
    let method = config.method_or_default();
    let transitional = config.transitional_or_default();
    let ctx = TransformContext {
        method: &method,
        transitional: &transitional,
        status: None,
    };

    let mut data = config.data.take();
    for transform in &transforms {
        data = transform(data, config.headers.flat_mut(), &ctx)?;
    }
    config.data = data;
    Ok(())
}

/// Run the configured response transforms over `response.data`.
pub fn transform_response_data(config: &RequestConfig, response: &mut Response) -> Result<(), Error> {
    let transforms = config
        .transform_response
        .clone()
        .unwrap_or_else(default_response_transforms);
    let method = config.method_or_default();
    let transitional = config.transitional_or_default();
    let ctx = TransformContext {
        method: &method,
        transitional: &transitional,
        status: Some(response.status),
    };

    let mut data = response.data.take();
    for transform in &transforms {
        data = transform(data, &response.headers, &ctx)?;
    }
    response.data = data;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Transitional;
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    fn json_response(body: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, APPLICATION_JSON.parse().unwrap());
        Response::new(StatusCode::OK, RequestConfig::new())
            .with_headers(headers)
            .with_data(body.to_string())
    }

    #[test]
    fn test_request_json_serialized_with_content_type() {
        let mut config = RequestConfig::new().data(json!({"a": 1}));
        transform_request_data(&mut config).unwrap();

        assert_eq!(config.data, Some(Data::Text(r#"{"a":1}"#.into())));
        assert_eq!(config.headers.flat().get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
    }

    #[test]
    fn test_request_keeps_explicit_content_type() {
        let mut config = RequestConfig::new()
            .header(CONTENT_TYPE, "text/json")
            .data(json!([1]));
        transform_request_data(&mut config).unwrap();
        assert_eq!(config.headers.flat().get(CONTENT_TYPE).unwrap(), "text/json");
    }

    #[test]
    fn test_custom_request_transforms_chain() {
        let mut config = RequestConfig::new()
            .data("a")
            .transform_request(|data, _, _| {
                let text = data.and_then(|d| d.as_text().map(str::to_owned)).unwrap_or_default();
                Ok(Some(Data::Text(format!("{text}b"))))
            })
            .transform_request(|data, headers, _| {
                headers.insert("x-seen", "1".parse().unwrap());
                Ok(data)
            });
        transform_request_data(&mut config).unwrap();

        assert_eq!(config.data, Some(Data::Text("ab".into())));
        assert_eq!(config.headers.flat().get("x-seen").unwrap(), "1");
    }

    #[test]
    fn test_response_json_parsed() {
        let config = RequestConfig::new();
        let mut response = json_response(r#"{"ok":true}"#);
        transform_response_data(&config, &mut response).unwrap();
        assert_eq!(response.data, Some(Data::Json(json!({"ok": true}))));
    }

    #[test]
    fn test_response_forced_parsing_without_content_type() {
        let config = RequestConfig::new();
        let mut response = Response::new(StatusCode::OK, RequestConfig::new()).with_data("[1,2]");
        transform_response_data(&config, &mut response).unwrap();
        assert_eq!(response.data, Some(Data::Json(json!([1, 2]))));

        let config = RequestConfig::new().transitional(Transitional::new().forced_json_parsing(false));
        let mut response = Response::new(StatusCode::OK, RequestConfig::new()).with_data("[1,2]");
        transform_response_data(&config, &mut response).unwrap();
        assert_eq!(response.data, Some(Data::Text("[1,2]".into())));
    }

    #[test]
    fn test_response_invalid_json_silent_by_default() {
        let config = RequestConfig::new();
        let mut response = json_response("not json");
        transform_response_data(&config, &mut response).unwrap();
        assert_eq!(response.data, Some(Data::Text("not json".into())));
    }

    #[test]
    fn test_response_invalid_json_strict() {
        let config = RequestConfig::new().transitional(Transitional::new().silent_json_parsing(false));
        let mut response = json_response("not json");
        let err = transform_response_data(&config, &mut response).unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }
}
