use crate::domain::WaitlistEmail;
use crate::registration::{RegisterError, RegistrationService};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

/// The body of `POST /waitlist/`. `email` is validated while deserializing, so a malformed address
/// is turned away by the extractor before the handler runs.
#[derive(serde::Deserialize)]
pub struct JoinRequest {
    email: WaitlistEmail,
}

#[derive(serde::Serialize)]
pub struct JoinResponse {
    id: String,
    email: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(serde::Serialize)]
struct ErrorDetail {
    detail: String,
}

impl ResponseError for RegisterError {
    fn status_code(&self) -> StatusCode {
        match self {
            RegisterError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RegisterError::DuplicateEntry => StatusCode::BAD_REQUEST,
            RegisterError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorDetail {
            detail: self.to_string(),
        })
    }
}

#[tracing::instrument(
    name = "Adding a new waitlist entry",
    skip(body, registration),
    fields(waitlist_email = %body.email)
)]
pub async fn join_waitlist(
    body: web::Json<JoinRequest>,
    registration: web::Data<RegistrationService>,
) -> Result<HttpResponse, RegisterError> {
    let JoinRequest { email } = body.into_inner();
    let entry = registration.register_email(email).await?;

    Ok(HttpResponse::Ok().json(JoinResponse {
        id: entry.id.to_string(),
        email: entry.email.as_ref().to_owned(),
    }))
}

/// Plugged into `web::JsonConfig`: a body that can't be turned into a `JoinRequest` (broken JSON,
/// missing field, malformed email, wrong type) is a 422. Other payload errors (wrong content type,
/// body too large, ...) keep the status actix gives them.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = match &err {
        JsonPayloadError::Deserialize(_) => StatusCode::UNPROCESSABLE_ENTITY,
        other => other.status_code(),
    };
    let response = HttpResponse::build(status).json(ErrorDetail {
        detail: err.to_string(),
    });
    InternalError::from_response(err, response).into()
}
