use inkrypt_core::account::AccountPage;
use inkrypt_core::records::{Address, Draft, InscriptionOrder, Post};
use serde::Serialize;

/// Everything the account page shows, for `--json` output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot<'a> {
    pub address: &'a Address,
    pub ongoing_inscriptions: &'a [InscriptionOrder],
    pub drafts: &'a [Draft],
    pub posts: &'a [Post],
}

impl<'a> AccountSnapshot<'a> {
    pub fn of<S>(page: &'a AccountPage<S>) -> Self
    where
        S: inkrypt_core::store::KeyValueStore,
    {
        Self {
            address: page.address(),
            ongoing_inscriptions: page.ongoing(),
            drafts: page.drafts(),
            posts: page.posts(),
        }
    }
}

fn order_line(order: &InscriptionOrder) -> String {
    let mut line = format!("  {} [{}]", order.order_id, order.state().unwrap_or("unknown"));
    if let Some(pay) = order.status.get("payAddress").and_then(|v| v.as_str()) {
        line.push_str(&format!(" pay to {pay}"));
    }
    if let Some(amount) = order.status.get("amount").and_then(|v| v.as_u64()) {
        line.push_str(&format!(" ({amount} sats)"));
    }
    line
}

/// Plain-text rendering of the account page.
pub fn account_text(snapshot: &AccountSnapshot<'_>) -> String {
    let mut lines = vec![
        "Account".to_string(),
        format!("Connected Address: {}", snapshot.address),
    ];

    if !snapshot.ongoing_inscriptions.is_empty() {
        lines.push("\nOngoing Inscriptions".to_string());
        lines.extend(snapshot.ongoing_inscriptions.iter().map(order_line));
    }

    lines.push("\nDrafts".to_string());
    if snapshot.drafts.is_empty() {
        lines.push("  You don't have any drafts.".to_string());
    }
    lines.extend(snapshot.drafts.iter().map(|draft| {
        format!(
            "  {}  {}  (last edited on {})",
            draft.id,
            draft.title,
            draft.day()
        )
    }));

    lines.push("\nInkrypted Posts".to_string());
    if snapshot.posts.is_empty() {
        lines.push("  You haven't published any posts yet.".to_string());
    }
    lines.extend(snapshot.posts.iter().map(|post| {
        format!(
            "  {}  {}  (published on {})",
            post.record.id,
            post.record.title,
            post.record.day()
        )
    }));

    lines.iter().map(|line| format!("{line}\n")).collect()
}
