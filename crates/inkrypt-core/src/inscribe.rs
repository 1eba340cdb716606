//! Flat-field integration: `inscribe/create`, `inscribe/order/{id}` and
//! `inscribe/refund`, each answering inside a `{code, msg, data}` envelope.

use log::error;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OrderError;
use crate::orders::{
    HttpTransport, NewInscription, OrderDescriptor, OrderService, StatusDescriptor,
};

pub const DEFAULT_BASE_URL: &str = "https://open-api.unisat.io/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    content: String,
    content_type: &'a str,
    receive_address: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundRequest<'a> {
    order_id: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// Outcome of a refund request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_fee: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Client for the enveloped flat-field API.
#[derive(Clone, Debug)]
pub struct InscribeClient {
    transport: HttpTransport,
}

impl InscribeClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    fn open_envelope<T>(endpoint: &str, envelope: Envelope<T>) -> Result<T, OrderError> {
        if envelope.code != 0 {
            error!("{endpoint} failed with code {}: {}", envelope.code, envelope.msg);
            return Err(OrderError::Api {
                code: envelope.code,
                message: envelope.msg,
            });
        }
        envelope.data.ok_or_else(|| {
            error!("{endpoint} returned no data");
            OrderError::Shape {
                endpoint: endpoint.to_string(),
                source: serde_json::Error::missing_field("data"),
            }
        })
    }

    /// Ask the service to refund an unfinished order.
    pub fn refund_order(&self, order_id: &str) -> Result<RefundDescriptor, OrderError> {
        const ENDPOINT: &str = "inscribe/refund";
        let envelope = self.transport.post(ENDPOINT, &RefundRequest { order_id })?;
        Self::open_envelope(ENDPOINT, envelope)
    }
}

impl OrderService for InscribeClient {
    /// Content is sent as text; bytes that are not UTF-8 are replaced.
    fn create_order(&self, inscription: &NewInscription) -> Result<OrderDescriptor, OrderError> {
        const ENDPOINT: &str = "inscribe/create";
        let request = CreateRequest {
            content: String::from_utf8_lossy(&inscription.content).into_owned(),
            content_type: &inscription.content_type,
            receive_address: inscription.receive_address.as_str(),
        };
        let envelope = self.transport.post(ENDPOINT, &request)?;
        Self::open_envelope(ENDPOINT, envelope)
    }

    fn order_status(&self, order_id: &str) -> Result<StatusDescriptor, OrderError> {
        let envelope = self.transport.get_segments(&["inscribe", "order", order_id])?;
        Self::open_envelope(&format!("inscribe/order/{order_id}"), envelope)
    }
}
