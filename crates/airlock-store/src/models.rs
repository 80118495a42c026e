//! Login-stash records.
//!
//! Every record has a pure `clean` validator that turns an untrusted JSON
//! value into the typed struct, and a `Serialize` impl that writes the same
//! JSON shape back out. `Deserialize` goes through the cleaner, so
//! `serde_json::from_str::<LoginRecord>` applies the full validation rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use airlock_shared::encoding::ser;
use airlock_shared::{EncryptedBox, LoginId, Snrp, VoucherStatus};

use crate::cleaners::{
    as_array, as_base32, as_base64, as_box, as_date, as_login_id, as_map, as_one_of, as_snrp,
    as_string, as_u64, Clean, FieldPath, ObjectReader,
};

// ---------------------------------------------------------------------------
// LoginRecord
// ---------------------------------------------------------------------------

/// One node in an account's tree of authentication methods.
///
/// Apart from the identity fields, each capability group is optional: an
/// absent group means that login method is not configured.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    // Identity
    pub app_id: String,
    pub login_id: LoginId,
    pub created: DateTime<Utc>,

    // Parent linkage. `parent_id` is rebuilt from the tree, never serialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_box: Option<EncryptedBox>,
    #[serde(skip)]
    pub parent_id: Option<LoginId>,

    // Two-factor
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base32_opt")]
    pub otp_key: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_reset_auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_reset_date: Option<DateTime<Utc>>,
    /// Seconds the OTP reset waits before taking effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_timeout: Option<u64>,

    // Password
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base64_opt")]
    pub password_auth: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_auth_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_auth_snrp: Option<Snrp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_key_snrp: Option<Snrp>,

    // PIN v2
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base64_opt")]
    pub pin2_id: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base64_opt")]
    pub pin2_auth: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin2_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin2_key_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin2_text_box: Option<EncryptedBox>,

    // Recovery v2. One auth digest per question; the count is not checked here.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base64_opt")]
    pub recovery2_id: Option<Vec<u8>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser::base64_seq_opt"
    )]
    pub recovery2_auth: Option<Vec<Vec<u8>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery2_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery2_key_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question2_box: Option<EncryptedBox>,

    // Secret key
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser::base64_opt")]
    pub login_auth: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_auth_box: Option<EncryptedBox>,

    // Resources
    pub children: Vec<LoginRecord>,
    pub key_boxes: Vec<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_key_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_key_box: Option<EncryptedBox>,
    pub vouchers: Vec<VoucherRecord>,

    // Obsolete PIN v1, read-only compatibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_box: Option<EncryptedBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_key_box: Option<EncryptedBox>,
}

impl LoginRecord {
    /// A bare login with only identity fields set.
    pub fn new(app_id: impl Into<String>, login_id: LoginId) -> Self {
        Self {
            app_id: app_id.into(),
            login_id,
            created: Utc::now(),
            parent_box: None,
            parent_id: None,
            otp_key: None,
            otp_reset_auth: None,
            otp_reset_date: None,
            otp_timeout: None,
            password_auth: None,
            password_auth_box: None,
            password_auth_snrp: None,
            password_box: None,
            password_key_snrp: None,
            pin2_id: None,
            pin2_auth: None,
            pin2_box: None,
            pin2_key_box: None,
            pin2_text_box: None,
            recovery2_id: None,
            recovery2_auth: None,
            recovery2_box: None,
            recovery2_key_box: None,
            question2_box: None,
            login_auth: None,
            login_auth_box: None,
            children: Vec::new(),
            key_boxes: Vec::new(),
            mnemonic_box: None,
            root_key_box: None,
            sync_key_box: None,
            vouchers: Vec::new(),
            pin_box: None,
            pin_id: None,
            pin_key_box: None,
        }
    }

    /// Validate an untrusted document into a login tree.
    ///
    /// Parent back-references are rebuilt from the tree shape; any `parentId`
    /// in the input is ignored. The validator does not bound recursion depth;
    /// callers reading untrusted input go through [`crate::StashLoader`].
    pub fn clean(value: &Value) -> Clean<Self> {
        let mut login = clean_login_node(value, &FieldPath::root())?;
        login.relink_parents();
        Ok(login)
    }

    pub fn has_password(&self) -> bool {
        self.password_auth.is_some() || self.password_key_snrp.is_some()
    }

    pub fn has_pin2(&self) -> bool {
        self.pin2_id.is_some()
    }

    pub fn has_recovery2(&self) -> bool {
        self.recovery2_id.is_some()
    }

    pub fn has_otp(&self) -> bool {
        self.otp_key.is_some()
    }
}

fn clean_login_node(value: &Value, path: &FieldPath) -> Clean<LoginRecord> {
    let obj = ObjectReader::new(value, path)?;

    Ok(LoginRecord {
        app_id: obj.required("appId", as_string)?,
        login_id: obj.required("loginId", as_login_id)?,
        // Records older than the field get stamped on load.
        created: obj.optional_or_else("created", as_date, Utc::now)?,

        parent_box: obj.optional("parentBox", as_box)?,
        parent_id: None,

        otp_key: obj.optional("otpKey", as_base32)?,
        otp_reset_auth: obj.optional("otpResetAuth", as_string)?,
        otp_reset_date: obj.optional("otpResetDate", as_date)?,
        otp_timeout: obj.optional("otpTimeout", as_u64)?,

        password_auth: obj.optional("passwordAuth", as_base64)?,
        password_auth_box: obj.optional("passwordAuthBox", as_box)?,
        password_auth_snrp: obj.optional("passwordAuthSnrp", as_snrp)?,
        password_box: obj.optional("passwordBox", as_box)?,
        password_key_snrp: obj.optional("passwordKeySnrp", as_snrp)?,

        pin2_id: obj.optional("pin2Id", as_base64)?,
        pin2_auth: obj.optional("pin2Auth", as_base64)?,
        pin2_box: obj.optional("pin2Box", as_box)?,
        pin2_key_box: obj.optional("pin2KeyBox", as_box)?,
        pin2_text_box: obj.optional("pin2TextBox", as_box)?,

        recovery2_id: obj.optional("recovery2Id", as_base64)?,
        recovery2_auth: obj.optional("recovery2Auth", |v, p| as_array(v, p, as_base64))?,
        recovery2_box: obj.optional("recovery2Box", as_box)?,
        recovery2_key_box: obj.optional("recovery2KeyBox", as_box)?,
        question2_box: obj.optional("question2Box", as_box)?,

        login_auth: obj.optional("loginAuth", as_base64)?,
        login_auth_box: obj.optional("loginAuthBox", as_box)?,

        children: obj.optional_or_else(
            "children",
            |v, p| as_array(v, p, clean_login_node),
            Vec::new,
        )?,
        key_boxes: obj.optional_or_else("keyBoxes", |v, p| as_array(v, p, as_box), Vec::new)?,
        mnemonic_box: obj.optional("mnemonicBox", as_box)?,
        root_key_box: obj.optional("rootKeyBox", as_box)?,
        sync_key_box: obj.optional("syncKeyBox", as_box)?,
        vouchers: obj.optional_or_else(
            "vouchers",
            |v, p| as_array(v, p, clean_voucher),
            Vec::new,
        )?,

        pin_box: obj.optional("pinBox", as_box)?,
        pin_id: obj.optional("pinId", as_string)?,
        pin_key_box: obj.optional("pinKeyBox", as_box)?,
    })
}

impl<'de> Deserialize<'de> for LoginRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::clean(&value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// VoucherRecord
// ---------------------------------------------------------------------------

/// A device-approval request attached to a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRecord {
    pub login_id: LoginId,
    #[serde(serialize_with = "ser::base64")]
    pub voucher_auth: Vec<u8>,
    pub voucher_id: String,
    pub created: DateTime<Utc>,
    /// When a pending voucher approves itself unless rejected first.
    pub activates: DateTime<Utc>,
    pub status: VoucherStatus,
    pub ip: String,
    pub ip_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_description: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("voucher {voucher_id} is already {status}")]
pub struct VoucherTransitionError {
    pub voucher_id: String,
    pub status: &'static str,
}

impl VoucherRecord {
    pub fn clean(value: &Value) -> Clean<Self> {
        clean_voucher(value, &FieldPath::root())
    }

    /// Status as of `now`: a pending voucher past `activates` counts as approved.
    pub fn effective_status(&self, now: DateTime<Utc>) -> VoucherStatus {
        match self.status {
            VoucherStatus::Pending if now >= self.activates => VoucherStatus::Approved,
            status => status,
        }
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), VoucherTransitionError> {
        self.transition(VoucherStatus::Approved, now)
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), VoucherTransitionError> {
        self.transition(VoucherStatus::Rejected, now)
    }

    fn transition(
        &mut self,
        next: VoucherStatus,
        now: DateTime<Utc>,
    ) -> Result<(), VoucherTransitionError> {
        if self.status.is_terminal() {
            return Err(VoucherTransitionError {
                voucher_id: self.voucher_id.clone(),
                status: self.status.as_str(),
            });
        }
        // Auto-approval already happened, so only approving is still legal.
        let effective = self.effective_status(now);
        if effective.is_terminal() && effective != next {
            return Err(VoucherTransitionError {
                voucher_id: self.voucher_id.clone(),
                status: effective.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

fn clean_voucher(value: &Value, path: &FieldPath) -> Clean<VoucherRecord> {
    let obj = ObjectReader::new(value, path)?;

    let status = obj.required("status", |v, p| as_one_of(v, p, VoucherStatus::ALL))?;

    Ok(VoucherRecord {
        login_id: obj.required("loginId", as_login_id)?,
        voucher_auth: obj.required("voucherAuth", as_base64)?,
        voucher_id: obj.required("voucherId", as_string)?,
        created: obj.required("created", as_date)?,
        activates: obj.required("activates", as_date)?,
        // as_one_of only admits the three tokens
        status: VoucherStatus::parse(status).unwrap_or(VoucherStatus::Pending),
        ip: obj.required("ip", as_string)?,
        ip_description: obj.required("ipDescription", as_string)?,
        device_description: obj.optional("deviceDescription", as_string)?,
    })
}

impl<'de> Deserialize<'de> for VoucherRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::clean(&value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// FakeUserRecord
// ---------------------------------------------------------------------------

/// Seed data for deterministic test doubles of the login server.
///
/// `repos` is a simulated remote-storage snapshot:
/// repository name -> file path -> box.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeUserRecord {
    pub username: String,
    pub login_id: LoginId,
    #[serde(serialize_with = "ser::base64")]
    pub login_key: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub server: LoginRecord,
    pub repos: BTreeMap<String, BTreeMap<String, EncryptedBox>>,
}

impl FakeUserRecord {
    pub fn clean(value: &Value) -> Clean<Self> {
        let obj = ObjectReader::new(value, &FieldPath::root())?;

        let mut server = obj.required("server", clean_login_node)?;
        server.relink_parents();

        Ok(Self {
            username: obj.required("username", as_string)?,
            login_id: obj.required("loginId", as_login_id)?,
            login_key: obj.required("loginKey", as_base64)?,
            last_login: obj.optional("lastLogin", as_date)?,
            server,
            repos: obj.required("repos", |v, p| {
                as_map(v, p, |files, fp| as_map(files, fp, as_box))
            })?,
        })
    }
}

impl<'de> Deserialize<'de> for FakeUserRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::clean(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaners::ValidationErrorKind;
    use airlock_shared::encoding::{encode_base32, encode_base64};
    use chrono::{Duration, SubsecRound};
    use serde_json::json;

    fn sample_box(tag: u8) -> EncryptedBox {
        EncryptedBox::new(0, vec![tag; 16], vec![tag, tag + 1, tag + 2])
    }

    fn sample_snrp() -> Snrp {
        Snrp {
            salt: vec![0x5a; 32],
            n: 16384,
            r: 8,
            p: 1,
        }
    }

    fn sample_voucher(login_id: LoginId, status: VoucherStatus) -> VoucherRecord {
        let created = Utc::now().trunc_subsecs(3);
        VoucherRecord {
            login_id,
            voucher_auth: vec![9; 32],
            voucher_id: "voucher-1".into(),
            created,
            activates: created + Duration::days(7),
            status,
            ip: "203.0.113.7".into(),
            ip_description: "Lisbon, Portugal".into(),
            device_description: Some("Pixel 8".into()),
        }
    }

    // A tree exercising every capability group and both text alphabets.
    fn sample_tree() -> LoginRecord {
        let mut root = LoginRecord::new("", LoginId([1; 32]));
        root.created = Utc::now().trunc_subsecs(3);
        root.otp_key = Some(b"0123456789".to_vec());
        root.otp_reset_date = Some(root.created + Duration::days(7));
        root.otp_timeout = Some(604_800);
        root.password_auth = Some(vec![2; 32]);
        root.password_auth_snrp = Some(sample_snrp());
        root.password_box = Some(sample_box(3));
        root.password_key_snrp = Some(sample_snrp());
        root.recovery2_id = Some(vec![4; 32]);
        root.recovery2_auth = Some(vec![vec![5; 32], vec![6; 32]]);
        root.question2_box = Some(sample_box(7));
        root.key_boxes = vec![sample_box(8), sample_box(9)];
        root.sync_key_box = Some(sample_box(10));
        root.vouchers = vec![sample_voucher(root.login_id, VoucherStatus::Pending)];
        root.pin_id = Some("legacy-pin".into());
        root.pin_box = Some(sample_box(11));

        let mut child = LoginRecord::new("edge-wallet", LoginId([2; 32]));
        child.created = root.created;
        child.parent_box = Some(sample_box(12));
        child.pin2_id = Some(vec![13; 32]);
        child.pin2_auth = Some(vec![14; 32]);
        child.pin2_text_box = Some(sample_box(15));
        child.login_auth = Some(vec![16; 32]);
        child.login_auth_box = Some(sample_box(17));

        root.push_child(child);
        root
    }

    fn minimal_doc() -> Value {
        json!({
            "appId": "",
            "loginId": encode_base64(&[1u8; 32]),
            "created": "2021-06-01T12:00:00.000Z",
        })
    }

    #[test]
    fn test_round_trip_reconstructs_tree() {
        let tree = sample_tree();
        let json = serde_json::to_value(&tree).unwrap();
        let cleaned = LoginRecord::clean(&json).unwrap();

        assert_eq!(cleaned, tree);
        assert_eq!(cleaned.children[0].parent_id, Some(tree.login_id));
    }

    #[test]
    fn test_round_trip_through_text() {
        let tree = sample_tree();
        let text = serde_json::to_string(&tree).unwrap();
        let parsed: LoginRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_writer_uses_per_field_alphabets() {
        let tree = sample_tree();
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json["otpKey"], encode_base32(b"0123456789"));
        assert_eq!(json["passwordAuth"], encode_base64(&[2u8; 32]));
        assert_eq!(json["passwordBox"]["iv_hex"], "03".repeat(16));
        assert!(json.get("parentId").is_none());
        assert!(json.get("mnemonicBox").is_none());
    }

    #[test]
    fn test_missing_created_defaults_to_now() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("created");

        let before = Utc::now();
        let login = LoginRecord::clean(&doc).unwrap();
        let after = Utc::now();

        assert!(login.created >= before && login.created <= after);
    }

    #[test]
    fn test_null_created_defaults_to_now() {
        let mut doc = minimal_doc();
        doc["created"] = Value::Null;

        let before = Utc::now();
        let login = LoginRecord::clean(&doc).unwrap();
        assert!(login.created >= before);
    }

    #[test]
    fn test_missing_app_id_fails_closed() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("appId");

        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(err.field(), Some("appId"));
        assert_eq!(err.kind, ValidationErrorKind::Missing);
    }

    #[test]
    fn test_empty_and_absent_children_are_equivalent() {
        let absent = minimal_doc();
        let mut empty = minimal_doc();
        empty["children"] = json!([]);
        empty["keyBoxes"] = json!([]);
        empty["vouchers"] = json!([]);

        let a = LoginRecord::clean(&absent).unwrap();
        let b = LoginRecord::clean(&empty).unwrap();
        assert_eq!(a, b);
        assert!(a.children.is_empty());
    }

    #[test]
    fn test_malformed_login_id() {
        let mut doc = minimal_doc();
        doc["loginId"] = json!("this is *not* base64");

        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(err.field(), Some("loginId"));
        assert!(matches!(err.kind, ValidationErrorKind::BadEncoding(_)));
    }

    #[test]
    fn test_short_login_id() {
        let mut doc = minimal_doc();
        doc["loginId"] = json!(encode_base64(&[1u8; 8]));

        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::BadLength {
                expected: 32,
                found: 8
            }
        );
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let mut doc = minimal_doc();
        doc["futureFeature"] = json!({ "enabled": true });

        let login = LoginRecord::clean(&doc).unwrap();
        let written = serde_json::to_value(&login).unwrap();
        assert!(written.get("futureFeature").is_none());
        assert_eq!(login, LoginRecord::clean(&minimal_doc()).unwrap());
    }

    #[test]
    fn test_input_parent_id_is_ignored() {
        let mut doc = minimal_doc();
        doc["parentId"] = json!(encode_base64(&[7u8; 32]));
        let login = LoginRecord::clean(&doc).unwrap();
        assert_eq!(login.parent_id, None);
    }

    #[test]
    fn test_nested_error_path() {
        let mut doc = minimal_doc();
        let mut child = minimal_doc();
        child["passwordBox"] = json!({ "encryptionType": 0, "iv_hex": "zz", "data_base64": "" });
        doc["children"] = json!([minimal_doc(), child]);

        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(err.path.to_string(), "children[1].passwordBox.iv_hex");
    }

    #[test]
    fn test_recovery2_auth_count_is_unchecked() {
        let mut doc = minimal_doc();
        doc["recovery2Auth"] = json!(["AQ==", "Ag==", "Aw=="]);

        let login = LoginRecord::clean(&doc).unwrap();
        assert_eq!(login.recovery2_auth, Some(vec![vec![1], vec![2], vec![3]]));
        assert!(login.question2_box.is_none());
    }

    #[test]
    fn test_otp_key_uses_base32() {
        let mut doc = minimal_doc();
        doc["otpKey"] = json!("JBSWY3DPEHPK3PXP");
        let login = LoginRecord::clean(&doc).unwrap();
        assert_eq!(login.otp_key.as_deref(), Some(&b"Hello!\xde\xad\xbe\xef"[..]));

        doc["otpKey"] = json!("AQID+A==");
        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(err.field(), Some("otpKey"));
    }

    fn voucher_doc(status: &str) -> Value {
        json!({
            "loginId": encode_base64(&[1u8; 32]),
            "voucherAuth": "AQID",
            "voucherId": "v-42",
            "created": "2024-03-01T00:00:00Z",
            "activates": "2024-03-08T00:00:00Z",
            "status": status,
            "ip": "198.51.100.1",
            "ipDescription": "Austin, Texas",
        })
    }

    #[test]
    fn test_voucher_status_enum_closure() {
        let approved = VoucherRecord::clean(&voucher_doc("approved")).unwrap();
        assert_eq!(approved.status, VoucherStatus::Approved);
        assert_eq!(approved.device_description, None);

        let err = VoucherRecord::clean(&voucher_doc("cancelled")).unwrap_err();
        assert_eq!(err.field(), Some("status"));
        assert!(matches!(err.kind, ValidationErrorKind::NotOneOf { .. }));
    }

    #[test]
    fn test_voucher_requires_ip_description() {
        let mut doc = voucher_doc("pending");
        doc.as_object_mut().unwrap().remove("ipDescription");
        let err = VoucherRecord::clean(&doc).unwrap_err();
        assert_eq!(err.field(), Some("ipDescription"));
    }

    #[test]
    fn test_voucher_error_inside_login() {
        let mut doc = minimal_doc();
        doc["vouchers"] = json!([voucher_doc("maybe")]);
        let err = LoginRecord::clean(&doc).unwrap_err();
        assert_eq!(err.path.to_string(), "vouchers[0].status");
    }

    #[test]
    fn test_voucher_lifecycle() {
        let mut voucher = sample_voucher(LoginId([1; 32]), VoucherStatus::Pending);
        let now = voucher.created + Duration::hours(1);

        assert_eq!(voucher.effective_status(now), VoucherStatus::Pending);
        voucher.reject(now).unwrap();
        assert_eq!(voucher.status, VoucherStatus::Rejected);

        let err = voucher.approve(now).unwrap_err();
        assert_eq!(err.status, "rejected");
    }

    #[test]
    fn test_voucher_auto_approves_at_activation() {
        let mut voucher = sample_voucher(LoginId([1; 32]), VoucherStatus::Pending);
        let later = voucher.activates + Duration::seconds(1);

        assert_eq!(voucher.effective_status(later), VoucherStatus::Approved);
        assert!(voucher.reject(later).is_err());
        voucher.approve(later).unwrap();
        assert_eq!(voucher.status, VoucherStatus::Approved);
    }

    #[test]
    fn test_fake_user_round_trip() {
        let mut files = BTreeMap::new();
        files.insert("Wallets/abc.json".to_string(), sample_box(20));
        let mut repos = BTreeMap::new();
        repos.insert("sync-repo-1".to_string(), files);

        let user = FakeUserRecord {
            username: "js test 0".into(),
            login_id: LoginId([1; 32]),
            login_key: vec![0x42; 32],
            last_login: Some(Utc::now().trunc_subsecs(3)),
            server: sample_tree(),
            repos,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(FakeUserRecord::clean(&json).unwrap(), user);
    }

    #[test]
    fn test_fake_user_bad_repo_box() {
        let doc = json!({
            "username": "u",
            "loginId": encode_base64(&[1u8; 32]),
            "loginKey": "AA==",
            "server": minimal_doc(),
            "repos": { "repo": { "file.json": { "encryptionType": "zero" } } },
        });
        let err = FakeUserRecord::clean(&doc).unwrap_err();
        assert_eq!(err.path.to_string(), "repos.repo.file.json.encryptionType");
    }
}
