//! Shared pieces of the inscription order integrations.
//!
//! The ordering service owns fees, payload encoding and error semantics; the
//! clients here only shape requests and parse responses into typed
//! descriptors. Nothing is retried and no timeout is overridden. Every
//! failure is logged and handed back to the caller unchanged.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use log::{debug, error};
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OrderError;
use crate::records::Address;

/// Lifecycle states reported by the ordering service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentNotEnough,
    PaymentOverpay,
    PaymentWithInscription,
    PaymentWaitConfirmed,
    PaymentSuccess,
    Ready,
    Inscribing,
    Minted,
    Closed,
    Refunded,
    Cancel,
    Unknown(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentNotEnough => "payment_notenough",
            OrderStatus::PaymentOverpay => "payment_overpay",
            OrderStatus::PaymentWithInscription => "payment_withinscription",
            OrderStatus::PaymentWaitConfirmed => "payment_waitconfirmed",
            OrderStatus::PaymentSuccess => "payment_success",
            OrderStatus::Ready => "ready",
            OrderStatus::Inscribing => "inscribing",
            OrderStatus::Minted => "minted",
            OrderStatus::Closed => "closed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Cancel => "cancel",
            OrderStatus::Unknown(other) => other,
        }
    }

    /// No further transitions are expected from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Minted | OrderStatus::Closed | OrderStatus::Refunded | OrderStatus::Cancel
        )
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => OrderStatus::Pending,
            "payment_notenough" => OrderStatus::PaymentNotEnough,
            "payment_overpay" => OrderStatus::PaymentOverpay,
            "payment_withinscription" => OrderStatus::PaymentWithInscription,
            "payment_waitconfirmed" => OrderStatus::PaymentWaitConfirmed,
            "payment_success" => OrderStatus::PaymentSuccess,
            "ready" => OrderStatus::Ready,
            "inscribing" => OrderStatus::Inscribing,
            "minted" => OrderStatus::Minted,
            "closed" => OrderStatus::Closed,
            "refunded" => OrderStatus::Refunded,
            "cancel" => OrderStatus::Cancel,
            _ => OrderStatus::Unknown(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content to inscribe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewInscription {
    pub content: Vec<u8>,
    pub content_type: String,
    pub receive_address: Address,
}

impl NewInscription {
    pub fn new(
        content: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        receive_address: Address,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            receive_address,
        }
    }

    /// `data:` URL carrying the content as inline base64.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            general_purpose::STANDARD.encode(&self.content)
        )
    }
}

/// The service's answer to an order creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDescriptor {
    pub order_id: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-file progress inside an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inscription_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The service's answer to a status query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDescriptor {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Create/poll contract shared by both integrations.
pub trait OrderService {
    fn create_order(&self, inscription: &NewInscription) -> Result<OrderDescriptor, OrderError>;

    fn order_status(&self, order_id: &str) -> Result<StatusDescriptor, OrderError>;
}

/// Base URL, static bearer credential and a blocking HTTP client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    base: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, OrderError> {
        let mut base =
            Url::parse(base_url).map_err(|err| OrderError::Url(format!("{base_url}: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| OrderError::Url(format!("invalid api key: {err}")))?;
        bearer.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, OrderError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| OrderError::Url(format!("{}{path}: {err}", self.base)))
    }

    /// POST `body` as JSON to `path` and parse the response as `T`.
    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OrderError> {
        let url = self.url(path)?;
        let body = serde_json::to_vec(body).map_err(OrderError::Encode)?;
        debug!("POST {url}");
        let response = self
            .client
            .post(url.clone())
            .body(body)
            .send()
            .map_err(|err| {
                error!("POST {url} failed: {err}");
                OrderError::Transport(err)
            })?;
        Self::parse(path, response)
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment.
    fn segments_url(&self, segments: &[&str]) -> Result<Url, OrderError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| OrderError::Url(format!("{} cannot take path segments", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET the endpoint made of `segments`, for paths carrying caller-supplied
    /// identifiers.
    pub fn get_segments<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, OrderError> {
        let url = self.segments_url(segments)?;
        self.fetch(&segments.join("/"), url)
    }

    fn fetch<T: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<T, OrderError> {
        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().map_err(|err| {
            error!("GET {url} failed: {err}");
            OrderError::Transport(err)
        })?;
        Self::parse(endpoint, response)
    }

    fn parse<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, OrderError> {
        let status = response.status();
        let text = response.text().map_err(|err| {
            error!("reading {path} response failed: {err}");
            OrderError::Transport(err)
        })?;

        if !status.is_success() {
            error!("{path} returned {status}: {text}");
            return Err(OrderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| {
            error!("{path} returned an unexpected body: {source}");
            OrderError::Shape {
                endpoint: path.to_string(),
                source,
            }
        })
    }
}
