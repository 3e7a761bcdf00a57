//! QR issuance request and response types

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};

/// Default branch code used by the gateway for the main office
pub const DEFAULT_BRANCH_CODE: &str = "E0001";

/// Days until a QR expires when no due date is given
pub const DEFAULT_DUE_IN_DAYS: i64 = 30;

/// Date format the gateway expects for `dueDate`
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Currencies accepted by the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "BOB")]
    Bob,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Bob => "BOB",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BOB" => Ok(Currency::Bob),
            "USD" => Ok(Currency::Usd),
            other => Err(Error::validation(format!(
                "Unsupported currency '{}', expected BOB or USD",
                other
            ))),
        }
    }
}

/// Optional issuance parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOptions {
    pub currency: Currency,
    /// Expiry date; `None` means today plus the configured number of days
    pub due_date: Option<NaiveDate>,
    pub single_use: bool,
    pub modify_amount: bool,
    pub branch_code: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            currency: Currency::Bob,
            due_date: None,
            single_use: true,
            modify_amount: false,
            branch_code: DEFAULT_BRANCH_CODE.to_string(),
        }
    }
}

impl QrOptions {
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    pub fn with_modify_amount(mut self, modify_amount: bool) -> Self {
        self.modify_amount = modify_amount;
        self
    }

    pub fn with_branch_code(mut self, branch_code: impl Into<String>) -> Self {
        self.branch_code = branch_code.into();
        self
    }
}

/// Body of the generateQR call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrRequest {
    pub transaction_id: String,
    pub account_credit: String,
    pub currency: Currency,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    #[serde(serialize_with = "serialize_due_date")]
    pub due_date: NaiveDate,
    pub single_use: bool,
    pub modify_amount: bool,
    pub branch_code: String,
}

fn serialize_due_date<S>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.format(DUE_DATE_FORMAT).to_string())
}

/// Parse a `YYYY-MM-DD` due date
pub fn parse_due_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DUE_DATE_FORMAT)
        .map_err(|_| Error::validation(format!("Invalid due date '{}', expected YYYY-MM-DD", value)))
}

/// Gateway reply to a successful issuance
///
/// Kept as an opaque mapping; only `qrId` and `qrImage` have accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrResponse(Map<String, JsonValue>);

impl QrResponse {
    pub fn new(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }

    /// QR identifier, whether the gateway sent it as a string or a number
    pub fn qr_id(&self) -> Option<String> {
        match self.0.get("qrId")? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Base64 PNG of the QR code
    pub fn qr_image(&self) -> Option<&str> {
        self.0.get("qrImage").and_then(|v| v.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, JsonValue> {
        self.0
    }

    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }
}
