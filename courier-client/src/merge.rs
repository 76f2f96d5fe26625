//! Layering per-call configuration over instance defaults.

use crate::config::RequestConfig;

/// Combine instance `defaults` with a per-call `config`.
///
/// - `url` and `data` come only from the per-call config.
/// - `headers` are merged name by name in every namespace, per-call winning.
/// - Every other field is taken from the per-call config when set, else from
///   the defaults.
pub fn merge_config(defaults: &RequestConfig, config: RequestConfig) -> RequestConfig {
    let mut headers = defaults.headers.clone();
    headers.merge(&config.headers);

    RequestConfig {
        url: config.url,
        data: config.data,
        headers,
        base_url: config.base_url.or_else(|| defaults.base_url.clone()),
        method: config.method.or_else(|| defaults.method.clone()),
        params: config.params.or_else(|| defaults.params.clone()),
        params_serializer: config
            .params_serializer
            .or_else(|| defaults.params_serializer.clone()),
        transform_request: config
            .transform_request
            .or_else(|| defaults.transform_request.clone()),
        transform_response: config
            .transform_response
            .or_else(|| defaults.transform_response.clone()),
        adapter: config.adapter.or_else(|| defaults.adapter.clone()),
        cancel_token: config.cancel_token.or_else(|| defaults.cancel_token.clone()),
        signal: config.signal.or_else(|| defaults.signal.clone()),
        transitional: config.transitional.or_else(|| defaults.transitional.clone()),
        timeout: config.timeout.or(defaults.timeout),
        validate_status: config
            .validate_status
            .or_else(|| defaults.validate_status.clone()),
    }
}
