use crate::error::{AppError, ServiceError};
use crate::handlers::{HandlerRegistry, ItemRequest, ItemResponse, QueryKind};
use crate::metrics::ITEM_REQUESTS_TOTAL;
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Network origin of a request, for audit logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routes requests to their handlers and classifies failures
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub async fn dispatch(
        &self,
        request: ItemRequest,
        origin: &RequestOrigin,
    ) -> Result<ItemResponse, AppError> {
        let kind = request.kind();
        let outcome = match self.registry.get(kind) {
            Some(handler) => handler
                .handle(request)
                .await
                .map_err(|err| classify(kind, err, origin)),
            None => {
                error!(query = %kind, "No handler registered");
                Err(AppError::Internal)
            }
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(err) => err.error_code(),
        };
        let action = kind.to_string();
        ITEM_REQUESTS_TOTAL
            .with_label_values(&[action.as_str(), label])
            .inc();

        outcome
    }

    /// Dispatch and unwrap the response variant the caller expects
    pub async fn dispatch_as<T>(&self, request: ItemRequest, origin: &RequestOrigin) -> Result<T, AppError>
    where
        T: TryFrom<ItemResponse, Error = ItemResponse>,
    {
        let kind = request.kind();
        let response = self.dispatch(request, origin).await?;
        T::try_from(response).map_err(|response| {
            error!(query = %kind, response = ?response, "Handler returned an unexpected response");
            AppError::Internal
        })
    }
}

/// Map a handler failure to the API-facing error for `kind`
pub fn classify(kind: QueryKind, err: ServiceError, origin: &RequestOrigin) -> AppError {
    if err.is_access_violation() {
        warn!(query = %kind, origin = %origin, message = %err, "Access violation");
        return AppError::AccessDenied;
    }

    match err {
        ServiceError::ItemNotFound(message) => AppError::NotFound(message),
        ServiceError::InvalidArgument(message) => AppError::InvalidArgument(message),
        ServiceError::Unavailable { message, source } => {
            debug!(query = %kind, message = %message, cause = ?source, "Service unavailable");
            AppError::ServiceUnavailable(message)
        }
        ServiceError::AccessViolation(_) => AppError::AccessDenied,
        ServiceError::Other(err) => {
            error!(query = %kind, origin = %origin, error = ?err, "Request failed");
            AppError::Internal
        }
    }
}
