use bytes::Bytes;

/// Status classifications a handler may return.
///
/// - `Ok` (200): Request successful
/// - `Created` (201): Resource created successfully
/// - `NoContent` (204): Successful request with no content
/// - `BadRequest` (400): The handler could not make sense of the request
/// - `Forbidden` (403): The resource exists but may not be served
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): HTTP method not supported
/// - `InternalServerError` (500): Server error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use spillway::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A handler's verdict on one request: what to send back.
///
/// Produced once per request cycle and consumed by the reply builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    pub status: StatusCode,
    pub content_type: String,
    pub content: Bytes,
}

impl Disposition {
    pub fn new(status: StatusCode, content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// A 200 OK disposition with the given body.
    pub fn ok(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::Ok, content_type, content)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::Forbidden, "text/plain", "403 Forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound, "text/plain", "404 Not Found")
    }
}
