//! File-payload integration: `order/create` takes the content as an inline
//! base64 `dataURL` together with fee settings, `order/{id}` reports status.
//! Responses are the bare descriptors.

use serde::Serialize;

use crate::error::OrderError;
use crate::orders::{
    HttpTransport, NewInscription, OrderDescriptor, OrderService, StatusDescriptor,
};

pub const DEFAULT_BASE_URL: &str = "https://open-api.unisat.io/v2/inscribe";

/// Fee settings attached to every created order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeeSettings {
    /// sat/vB
    pub fee_rate: f64,
    /// Value of the output carrying the inscription, in sats.
    pub output_value: u64,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            fee_rate: 1.0,
            output_value: 546,
        }
    }
}

#[derive(Serialize)]
struct FilePayload {
    filename: String,
    #[serde(rename = "dataURL")]
    data_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    receive_address: &'a str,
    fee_rate: f64,
    output_value: u64,
    files: Vec<FilePayload>,
}

/// File name advertised for a payload of `content_type`.
pub fn payload_filename(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let extension = match essence.as_str() {
        "text/plain" => "txt",
        "text/markdown" => "md",
        "text/html" => "html",
        "application/json" => "json",
        "image/svg+xml" => "svg",
        "image/jpeg" => "jpg",
        other => match other.split_once('/') {
            Some((_, sub))
                if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                sub
            }
            _ => "bin",
        },
    };
    format!("inscription.{extension}")
}

/// Client for the file-payload API.
#[derive(Clone, Debug)]
pub struct OrderClient {
    transport: HttpTransport,
    fees: FeeSettings,
}

impl OrderClient {
    pub fn new(transport: HttpTransport, fees: FeeSettings) -> Self {
        Self { transport, fees }
    }

    pub fn fees(&self) -> FeeSettings {
        self.fees
    }
}

impl OrderService for OrderClient {
    fn create_order(&self, inscription: &NewInscription) -> Result<OrderDescriptor, OrderError> {
        let request = CreateRequest {
            receive_address: inscription.receive_address.as_str(),
            fee_rate: self.fees.fee_rate,
            output_value: self.fees.output_value,
            files: vec![FilePayload {
                filename: payload_filename(&inscription.content_type),
                data_url: inscription.data_url(),
            }],
        };
        self.transport.post("order/create", &request)
    }

    fn order_status(&self, order_id: &str) -> Result<StatusDescriptor, OrderError> {
        self.transport.get_segments(&["order", order_id])
    }
}
