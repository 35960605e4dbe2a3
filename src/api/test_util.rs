use crate::routing_utils::BasicErrorResponse;
use axum::body;
use serde::de::DeserializeOwned;

/// Reads a whole response body and parses it as JSON, failing the test if either step fails
pub async fn deserialize_body<T: DeserializeOwned>(response_body: body::Body) -> T {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("response body should be readable");

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!(
            "response body did not match the expected type: {}, body was {:?}",
            err,
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// Names of the fields an error response complains about, in alphabetical order
pub async fn error_fields(response_body: body::Body) -> Vec<String> {
    let error_body: BasicErrorResponse = deserialize_body(response_body).await;

    error_body
        .errors
        .map(|errors| errors.into_keys().collect())
        .unwrap_or_default()
}
