/*
 * Responsibility
 * - Outermost response shaping for failures: every AppError leaving the
 *   router is rewritten into the ErrorDto contract with the request path
 * - One classified log line per failure (info / warn / error), written
 *   here because only this layer knows the method and path
 */
use axum::Json;
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};

use crate::error::{ErrorDto, ErrorMeta};

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(respond))
}

async fn respond(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let Some(meta) = response.extensions_mut().remove::<ErrorMeta>() else {
        return response;
    };

    meta.write_log(&method, &path);

    let mut dto = ErrorDto::new(meta.message.clone(), path, meta.status);
    dto.details = meta.details.clone();
    (meta.status, Json(dto)).into_response()
}
