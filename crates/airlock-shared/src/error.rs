//! Domain error taxonomy.
//!
//! Every [`CoreError`] carries a stable name token (`PasswordError`,
//! `OtpError`, ...) that host applications match on, plus whatever metadata
//! the condition needs. Errors built from server payloads extract that
//! metadata best-effort: a malformed sub-field is dropped, so the caller
//! still sees the right error kind.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::encoding::{self, ser};
use crate::types::LoginId;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name")]
pub enum CoreError {
    #[error("Insufficient funds")]
    #[serde(rename = "InsufficientFundsError", rename_all = "camelCase")]
    InsufficientFunds {
        currency_code: Option<String>,
        network_fee: Option<String>,
    },

    #[error("Cannot reach the network")]
    #[serde(rename = "NetworkError")]
    Network { detail: Option<String> },

    #[error("The application is too old. Please upgrade.")]
    #[serde(rename = "ObsoleteApiError")]
    ObsoleteApi,

    #[error("The login requires two-factor authentication")]
    #[serde(rename = "OtpError", rename_all = "camelCase")]
    Otp {
        login_id: Option<LoginId>,
        reset_token: Option<String>,
        reset_date: Option<DateTime<Utc>>,
        voucher_id: Option<String>,
        #[serde(serialize_with = "ser::base64_opt")]
        voucher_auth: Option<Vec<u8>>,
        voucher_activates: Option<DateTime<Utc>>,
        reason: OtpReason,
    },

    #[error("Invalid password")]
    #[serde(rename = "PasswordError", rename_all = "camelCase")]
    Password { wait_seconds: Option<u64> },

    #[error("Not enough confirmed funds")]
    #[serde(rename = "PendingFundsError")]
    PendingFunds,

    #[error("Wallets can not be the same currency")]
    #[serde(rename = "SameCurrencyError")]
    SameCurrency,

    #[error("Spending to self")]
    #[serde(rename = "SpendToSelfError", rename_all = "camelCase")]
    SpendToSelf { spend_address: Option<String> },

    #[error("Amount is too high")]
    #[serde(rename = "SwapAboveLimitError", rename_all = "camelCase")]
    SwapAboveLimit {
        plugin_id: String,
        native_max: String,
        direction: SwapDirection,
    },

    #[error("Amount is too low")]
    #[serde(rename = "SwapBelowLimitError", rename_all = "camelCase")]
    SwapBelowLimit {
        plugin_id: String,
        native_min: String,
        direction: SwapDirection,
    },

    #[error("{from_currency} to {to_currency} is not supported")]
    #[serde(rename = "SwapCurrencyError", rename_all = "camelCase")]
    SwapCurrency {
        plugin_id: String,
        from_currency: String,
        to_currency: String,
    },

    #[error("You are not allowed to make this trade")]
    #[serde(rename = "SwapPermissionError", rename_all = "camelCase")]
    SwapPermission {
        plugin_id: String,
        reason: Option<SwapPermissionReason>,
    },

    #[error("Invalid username")]
    #[serde(rename = "UsernameError")]
    Username,

    #[error("Login requires a challenge")]
    #[serde(rename = "ChallengeError", rename_all = "camelCase")]
    Challenge {
        challenge_id: Option<String>,
        challenge_uri: Option<String>,
    },

    #[error("Unable to create zero-amount transaction")]
    #[serde(rename = "NoAmountSpecifiedError")]
    NoAmountSpecified,

    #[error("Please send a larger amount")]
    #[serde(rename = "DustSpendError")]
    DustSpend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpReason {
    /// A new IP address needs approval.
    Ip,
    /// The account has 2FA enabled and no valid token was presented.
    Otp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapDirection {
    From,
    To,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapPermissionReason {
    GeoRestriction,
    NoVerification,
    NeedsActivation,
}

impl CoreError {
    /// Every name token the taxonomy can produce.
    pub const NAMES: &'static [&'static str] = &[
        "InsufficientFundsError",
        "NetworkError",
        "ObsoleteApiError",
        "OtpError",
        "PasswordError",
        "PendingFundsError",
        "SameCurrencyError",
        "SpendToSelfError",
        "SwapAboveLimitError",
        "SwapBelowLimitError",
        "SwapCurrencyError",
        "SwapPermissionError",
        "UsernameError",
        "ChallengeError",
        "NoAmountSpecifiedError",
        "DustSpendError",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "InsufficientFundsError",
            Self::Network { .. } => "NetworkError",
            Self::ObsoleteApi => "ObsoleteApiError",
            Self::Otp { .. } => "OtpError",
            Self::Password { .. } => "PasswordError",
            Self::PendingFunds => "PendingFundsError",
            Self::SameCurrency => "SameCurrencyError",
            Self::SpendToSelf { .. } => "SpendToSelfError",
            Self::SwapAboveLimit { .. } => "SwapAboveLimitError",
            Self::SwapBelowLimit { .. } => "SwapBelowLimitError",
            Self::SwapCurrency { .. } => "SwapCurrencyError",
            Self::SwapPermission { .. } => "SwapPermissionError",
            Self::Username => "UsernameError",
            Self::Challenge { .. } => "ChallengeError",
            Self::NoAmountSpecified => "NoAmountSpecifiedError",
            Self::DustSpend => "DustSpendError",
        }
    }

    pub fn insufficient_funds(currency_code: Option<String>) -> Self {
        Self::InsufficientFunds {
            currency_code,
            network_fee: None,
        }
    }

    /// Build an `OtpError` from a login-server results payload.
    pub fn otp_from_payload(payload: &Value) -> Self {
        let reason = match str_field(payload, "reason") {
            Some("ip") => OtpReason::Ip,
            _ => OtpReason::Otp,
        };

        Self::Otp {
            login_id: str_field(payload, "login_id").and_then(|s| s.parse().ok()),
            reset_token: str_field(payload, "otp_reset_auth").map(str::to_string),
            reset_date: date_field(payload, "otp_timeout_date"),
            voucher_id: str_field(payload, "voucher_id").map(str::to_string),
            voucher_auth: str_field(payload, "voucher_auth")
                .and_then(|s| encoding::decode_base64(s).ok()),
            voucher_activates: date_field(payload, "voucher_activates"),
            reason,
        }
    }

    /// Build a `PasswordError` from a login-server results payload.
    pub fn password_from_payload(payload: &Value) -> Self {
        Self::Password {
            wait_seconds: payload.get("wait_seconds").and_then(Value::as_u64),
        }
    }

    pub fn challenge_from_payload(payload: &Value) -> Self {
        Self::Challenge {
            challenge_id: str_field(payload, "challengeId").map(str::to_string),
            challenge_uri: str_field(payload, "challengeUri").map(str::to_string),
        }
    }

    /// JSON for a UI layer: the name token, a message, and the metadata.
    pub fn to_json(&self) -> Value {
        let mut json = serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "name": self.name() })
        });
        if let Value::Object(map) = &mut json {
            map.insert("message".into(), Value::String(self.to_string()));
        }
        json
    }
}

/// Outcome of a failed login-server request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoginFault {
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Not part of the taxonomy; callers treat it as unexpected.
    #[error("{0}")]
    Unclassified(String),
}

impl LoginFault {
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Domain(e) => Some(e.name()),
            Self::Unclassified(_) => None,
        }
    }
}

/// Map a login-server status code onto the error taxonomy.
///
/// Returns `None` for status 0 (success).
pub fn error_from_login_status(status_code: i64, message: &str, results: &Value) -> Option<LoginFault> {
    let fault = match status_code {
        0 => return None,
        // account exists / no account
        2 | 3 => CoreError::Username.into(),
        // invalid password / invalid recovery answers
        4 | 5 => CoreError::password_from_payload(results).into(),
        8 => CoreError::otp_from_payload(results).into(),
        1000 => CoreError::ObsoleteApi.into(),
        _ => LoginFault::Unclassified(format!("Login server error {status_code}: {message}")),
    };
    Some(fault)
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn date_field(payload: &Value, key: &str) -> Option<DateTime<Utc>> {
    match payload.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_cover_every_variant() {
        let samples = [
            CoreError::insufficient_funds(Some("BTC".into())),
            CoreError::Network { detail: None },
            CoreError::ObsoleteApi,
            CoreError::otp_from_payload(&json!({})),
            CoreError::Password { wait_seconds: None },
            CoreError::PendingFunds,
            CoreError::SameCurrency,
            CoreError::SpendToSelf { spend_address: None },
            CoreError::SwapAboveLimit {
                plugin_id: "p".into(),
                native_max: "1".into(),
                direction: SwapDirection::From,
            },
            CoreError::SwapBelowLimit {
                plugin_id: "p".into(),
                native_min: "1".into(),
                direction: SwapDirection::To,
            },
            CoreError::SwapCurrency {
                plugin_id: "p".into(),
                from_currency: "BTC".into(),
                to_currency: "XMR".into(),
            },
            CoreError::SwapPermission {
                plugin_id: "p".into(),
                reason: Some(SwapPermissionReason::GeoRestriction),
            },
            CoreError::Username,
            CoreError::challenge_from_payload(&json!({})),
            CoreError::NoAmountSpecified,
            CoreError::DustSpend,
        ];

        for (error, name) in samples.iter().zip(CoreError::NAMES) {
            assert_eq!(error.name(), *name);
            assert_eq!(error.to_json()["name"], *name);
        }
    }

    #[test]
    fn test_otp_payload_extraction() {
        let login_id = LoginId([7u8; 32]);
        let payload = json!({
            "login_id": login_id.to_base64(),
            "otp_reset_auth": "reset-token",
            "otp_timeout_date": "2024-01-02T03:04:05Z",
            "reason": "ip",
            "voucher_id": "v1",
            "voucher_auth": "AQID",
            "voucher_activates": 1704164645000i64,
        });

        let CoreError::Otp {
            login_id: parsed_id,
            reset_token,
            reset_date,
            voucher_id,
            voucher_auth,
            voucher_activates,
            reason,
        } = CoreError::otp_from_payload(&payload)
        else {
            panic!("expected OtpError");
        };

        assert_eq!(parsed_id, Some(login_id));
        assert_eq!(reset_token.as_deref(), Some("reset-token"));
        assert!(reset_date.is_some());
        assert_eq!(voucher_id.as_deref(), Some("v1"));
        assert_eq!(voucher_auth, Some(vec![1, 2, 3]));
        assert_eq!(voucher_activates, reset_date);
        assert_eq!(reason, OtpReason::Ip);
    }

    #[test]
    fn test_otp_payload_tolerates_garbage() {
        let payload = json!({
            "login_id": "%%%",
            "otp_reset_auth": 42,
            "otp_timeout_date": "yesterday",
            "voucher_auth": ["nope"],
            "reason": "unknown",
        });

        let error = CoreError::otp_from_payload(&payload);
        assert_eq!(error.name(), "OtpError");
        let CoreError::Otp {
            login_id,
            reset_token,
            reset_date,
            voucher_auth,
            reason,
            ..
        } = error
        else {
            panic!("expected OtpError");
        };
        assert!(login_id.is_none());
        assert!(reset_token.is_none());
        assert!(reset_date.is_none());
        assert!(voucher_auth.is_none());
        assert_eq!(reason, OtpReason::Otp);
    }

    #[test]
    fn test_otp_payload_not_an_object() {
        let error = CoreError::otp_from_payload(&json!("server exploded"));
        assert_eq!(error.name(), "OtpError");
    }

    #[test]
    fn test_password_wait() {
        let error = CoreError::password_from_payload(&json!({ "wait_seconds": 30 }));
        assert_eq!(error, CoreError::Password { wait_seconds: Some(30) });
        assert_eq!(error.to_json()["waitSeconds"], 30);
        assert_eq!(error.to_json()["message"], "Invalid password");
    }

    #[test]
    fn test_login_status_mapping() {
        let results = json!({ "wait_seconds": 5 });
        assert_eq!(error_from_login_status(0, "", &results), None);

        let fault = error_from_login_status(4, "bad password", &results).unwrap();
        assert_eq!(fault.name(), Some("PasswordError"));

        let fault = error_from_login_status(3, "no account", &Value::Null).unwrap();
        assert_eq!(fault, LoginFault::Domain(CoreError::Username));

        let fault = error_from_login_status(8, "otp", &Value::Null).unwrap();
        assert_eq!(fault.name(), Some("OtpError"));

        let fault = error_from_login_status(1000, "obsolete", &Value::Null).unwrap();
        assert_eq!(fault.name(), Some("ObsoleteApiError"));
    }

    #[test]
    fn test_unknown_status_is_unclassified() {
        let fault = error_from_login_status(6, "Invalid API key", &Value::Null).unwrap();
        assert_eq!(fault.name(), None);
        assert_eq!(fault.to_string(), "Login server error 6: Invalid API key");
    }
}
