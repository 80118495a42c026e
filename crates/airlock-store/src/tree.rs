//! Traversal of login trees.
//!
//! Children have no identity outside their parent, so the `parent_id`
//! back-reference is derived here from the tree shape and never trusted from
//! serialized input.

use chrono::{DateTime, Utc};
use serde_json::Value;

use airlock_shared::{LoginId, VoucherStatus};

use crate::models::{LoginRecord, VoucherRecord};

impl LoginRecord {
    /// Rebuild `parent_id` on every descendant. The receiver becomes a root.
    pub fn relink_parents(&mut self) {
        self.link_under(None);
    }

    fn link_under(&mut self, parent: Option<LoginId>) {
        self.parent_id = parent;
        let id = self.login_id;
        for child in &mut self.children {
            child.link_under(Some(id));
        }
    }

    /// Attach `child` and point its subtree at this login.
    pub fn push_child(&mut self, mut child: LoginRecord) {
        child.link_under(Some(self.login_id));
        self.children.push(child);
    }

    /// Number of login levels, counting this one.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        max
    }

    /// Pre-order iterator over this login and every descendant.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn find(&self, predicate: impl FnMut(&&LoginRecord) -> bool) -> Option<&LoginRecord> {
        self.walk().find(predicate)
    }

    pub fn find_by_login_id(&self, login_id: &LoginId) -> Option<&LoginRecord> {
        self.find(|login| login.login_id == *login_id)
    }

    pub fn find_by_app_id(&self, app_id: &str) -> Option<&LoginRecord> {
        self.find(|login| login.app_id == app_id)
    }

    pub fn find_by_login_id_mut(&mut self, login_id: &LoginId) -> Option<&mut LoginRecord> {
        if self.login_id == *login_id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_login_id_mut(login_id))
    }

    /// Vouchers anywhere in the tree still awaiting a decision at `now`.
    pub fn pending_vouchers(&self, now: DateTime<Utc>) -> Vec<&VoucherRecord> {
        self.walk()
            .flat_map(|login| login.vouchers.iter())
            .filter(|voucher| voucher.effective_status(now) == VoucherStatus::Pending)
            .collect()
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a LoginRecord>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a LoginRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Login nesting depth of a raw document, following `children` arrays.
///
/// Iterative, so it is safe to call on input that has not been bounded yet.
pub fn value_depth(value: &Value) -> usize {
    let mut max = 0;
    let mut stack = vec![(value, 1usize)];
    while let Some((node, depth)) = stack.pop() {
        max = max.max(depth);
        if let Some(Value::Array(children)) = node.get("children") {
            stack.extend(children.iter().map(|child| (child, depth + 1)));
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn login(tag: u8, app_id: &str) -> LoginRecord {
        LoginRecord::new(app_id, LoginId([tag; 32]))
    }

    fn family() -> LoginRecord {
        let mut root = login(1, "");
        let mut wallet = login(2, "wallet");
        wallet.push_child(login(3, "wallet.plugin"));
        root.push_child(wallet);
        root.push_child(login(4, "exchange"));
        root
    }

    #[test]
    fn test_push_child_links_whole_subtree() {
        let root = family();
        let grandchild = root.find_by_app_id("wallet.plugin").unwrap();
        assert_eq!(grandchild.parent_id, Some(LoginId([2; 32])));
        assert_eq!(root.children[0].parent_id, Some(root.login_id));
        assert_eq!(root.parent_id, None);
    }

    #[test]
    fn test_relink_overwrites_stale_parents() {
        let mut root = family();
        root.children[1].parent_id = Some(LoginId([99; 32]));
        root.parent_id = Some(LoginId([98; 32]));

        root.relink_parents();
        assert_eq!(root.parent_id, None);
        assert_eq!(root.children[1].parent_id, Some(root.login_id));
    }

    #[test]
    fn test_walk_is_preorder() {
        let root = family();
        let apps: Vec<&str> = root.walk().map(|l| l.app_id.as_str()).collect();
        assert_eq!(apps, vec!["", "wallet", "wallet.plugin", "exchange"]);
    }

    #[test]
    fn test_depth() {
        assert_eq!(login(1, "").depth(), 1);
        assert_eq!(family().depth(), 3);
    }

    #[test]
    fn test_find_mut() {
        let mut root = family();
        root.find_by_login_id_mut(&LoginId([3; 32]))
            .unwrap()
            .otp_timeout = Some(60);
        assert_eq!(
            root.find_by_app_id("wallet.plugin").unwrap().otp_timeout,
            Some(60)
        );
        assert!(root.find_by_login_id_mut(&LoginId([42; 32])).is_none());
    }

    #[test]
    fn test_pending_vouchers_across_tree() {
        let now = Utc::now();
        let voucher = |status, activates| VoucherRecord {
            login_id: LoginId([2; 32]),
            voucher_auth: vec![1],
            voucher_id: "v".into(),
            created: now,
            activates,
            status,
            ip: "ip".into(),
            ip_description: "desc".into(),
            device_description: None,
        };

        let mut root = family();
        root.vouchers.push(voucher(VoucherStatus::Pending, now + Duration::days(1)));
        root.children[0]
            .vouchers
            .push(voucher(VoucherStatus::Pending, now - Duration::days(1)));
        root.children[1]
            .vouchers
            .push(voucher(VoucherStatus::Rejected, now + Duration::days(1)));

        assert_eq!(root.pending_vouchers(now).len(), 1);
    }

    #[test]
    fn test_value_depth() {
        let doc = json!({
            "children": [
                { "children": [ { "children": [] } ] },
                {}
            ]
        });
        assert_eq!(value_depth(&doc), 3);
        assert_eq!(value_depth(&json!("not an object")), 1);
    }
}
