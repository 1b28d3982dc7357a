//! Redirect responses.

use axum::body::Body;
use axum::http::header::{InvalidHeaderValue, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::mapping::rule::is_absolute_url;

/// `Location` value for a destination. Stored links are site-relative
/// without a leading slash, so one is added; absolute URLs pass through.
pub fn location_for(destination: &str) -> String {
    if is_absolute_url(destination) || destination.starts_with('/') {
        destination.to_string()
    } else {
        format!("/{destination}")
    }
}

/// An empty-bodied redirect to `destination`.
pub fn redirect_response(destination: &str, status: u16) -> Result<Response, InvalidHeaderValue> {
    let location = HeaderValue::from_str(&location_for(destination))?;
    let status = StatusCode::from_u16(status)
        .ok()
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::SEE_OTHER);

    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(LOCATION, location);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_for() {
        assert_eq!(location_for("new/page"), "/new/page");
        assert_eq!(location_for("/a/b"), "/a/b");
        assert_eq!(location_for("https://example.com/x"), "https://example.com/x");
        assert_eq!(location_for(""), "/");
    }

    #[test]
    fn test_redirect_response() {
        let response = redirect_response("new", 308).unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/new");

        let response = redirect_response("new", 200).unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        assert!(redirect_response("bad\nvalue", 301).is_err());
    }
}
