use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] talkshop_catalog::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: String },

    #[error("missing argument `{argument}` for {tool}")]
    MissingArgument { tool: String, argument: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn product_not_found(product_id: impl Into<String>) -> Self {
        Self::ProductNotFound {
            product_id: product_id.into(),
        }
    }

    #[must_use]
    pub fn missing_argument(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            tool: tool.into(),
            argument: argument.into(),
        }
    }
}

impl talkshop_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

talkshop_common::impl_context!();
