use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GasStationError {
    #[error("UrlParseError: {message}")]
    UrlParseError { value: String, message: String },

    #[error("HttpClientBackendError: {message}")]
    HttpClientBackendError { message: String },

    #[error("HttpError: {error}")]
    HttpError {
        #[from]
        error: SerializableReqwestError,
    },

    #[error("InvalidFee: {field} = {value} does not convert to wei")]
    InvalidFee { field: String, value: f64 },
}

impl GasStationError {
    pub fn url(value: String, error: url::ParseError) -> Self {
        Self::UrlParseError {
            value,
            message: error.to_string(),
        }
    }

    pub fn http_client_backend(error: reqwest::Error) -> Self {
        Self::HttpClientBackendError {
            message: error.to_string(),
        }
    }

    pub fn invalid_fee(field: &str, value: f64) -> Self {
        Self::InvalidFee {
            field: field.to_string(),
            value,
        }
    }
}

#[derive(Error, Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerializableReqwestError {
    #[error("operation timed out")]
    Timeout {
        message: String,
        url: Option<String>,
    },

    #[error("connection failed")]
    Connect {
        message: String,
        url: Option<String>,
    },

    #[error("error sending request")]
    Request {
        message: String,
        url: Option<String>,
    },

    #[error("HTTP status {status}")]
    Status {
        status: u16,
        message: String,
        url: Option<String>,
    },

    #[error("error decoding response body: {message}")]
    Decode {
        message: String,
        url: Option<String>,
    },

    #[error("request or response body error")]
    Body {
        message: String,
        url: Option<String>,
    },

    #[error("unknown error: {message}")]
    Unknown {
        message: String,
        url: Option<String>,
    },
}

impl From<&reqwest::Error> for SerializableReqwestError {
    fn from(error: &reqwest::Error) -> Self {
        let message = error.to_string();
        let url = error.url().map(|u| u.to_string());

        if error.is_timeout() {
            Self::Timeout { message, url }
        } else if error.is_connect() {
            Self::Connect { message, url }
        } else if let Some(status) = error.status() {
            Self::Status {
                status: status.as_u16(),
                message,
                url,
            }
        } else if error.is_decode() {
            Self::Decode { message, url }
        } else if error.is_body() {
            Self::Body { message, url }
        } else if error.is_request() {
            Self::Request { message, url }
        } else {
            Self::Unknown { message, url }
        }
    }
}

impl From<reqwest::Error> for SerializableReqwestError {
    fn from(error: reqwest::Error) -> Self {
        Self::from(&error)
    }
}
