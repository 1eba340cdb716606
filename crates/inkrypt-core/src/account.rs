//! The account view model.
//!
//! Derives the signed-in address's posts, drafts and ongoing inscriptions from
//! the shared local store, and carries out the draft actions of the account
//! page. Storage writes and view updates are two separate steps: when a write
//! succeeds and the view update is never reached, storage and view disagree
//! until the next [`AccountPage::reload`].

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AccountError;
use crate::orders::{OrderDescriptor, StatusDescriptor};
use crate::records::{Address, Draft, InscriptionOrder, Ownable, Owned, Post};
use crate::session::Session;
use crate::store::{Collection, KeyValueStore, LocalStore};

/// Destinations the account page can hand control to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    /// Unauthenticated landing page.
    Home,
    /// The draft editor, optionally seeded with an existing draft.
    Editor { draft: Option<Draft> },
}

/// Receives navigation requests from the view.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

impl Navigator for Vec<Route> {
    fn navigate(&mut self, route: Route) {
        self.push(route);
    }
}

/// Outcome of activating the account page.
#[derive(Debug)]
pub enum Activation<S> {
    /// Nobody is signed in; no account content is available.
    Redirect(Route),
    Active(AccountPage<S>),
}

impl<S> Activation<S> {
    pub fn active(self) -> Option<AccountPage<S>> {
        match self {
            Activation::Active(page) => Some(page),
            Activation::Redirect(_) => None,
        }
    }
}

/// Keep only rows owned by `address`, preserving their relative order.
pub fn filter_owned<T: Ownable>(rows: Vec<T>, address: &Address) -> Vec<T> {
    rows.into_iter().filter(|row| row.owner() == address).collect()
}

fn field_is(row: &Value, field: &str, expected: &str) -> bool {
    row.get(field).and_then(Value::as_str) == Some(expected)
}

fn descriptor_fields<T: Serialize>(descriptor: &T) -> Result<Map<String, Value>, AccountError> {
    let value = serde_json::to_value(descriptor).map_err(|source| {
        AccountError::Store(crate::StoreError::Encode {
            key: Collection::OngoingInscriptions.key().to_string(),
            source,
        })
    })?;
    let mut fields = match value {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.remove("orderId");
    fields.remove("address");
    Ok(fields)
}

/// The account page's state for one signed-in address.
#[derive(Debug)]
pub struct AccountPage<S> {
    store: LocalStore<S>,
    address: Address,
    posts: Vec<Post>,
    drafts: Vec<Draft>,
    ongoing: Vec<InscriptionOrder>,
}

impl<S: KeyValueStore> AccountPage<S> {
    /// Activate the page for `session`, reading every collection once.
    pub fn activate(session: &Session, store: LocalStore<S>) -> Activation<S> {
        let Some(address) = session.active_address() else {
            debug!("no active address, redirecting home");
            return Activation::Redirect(Route::Home);
        };
        let mut page = Self {
            store,
            address: address.clone(),
            posts: Vec::new(),
            drafts: Vec::new(),
            ongoing: Vec::new(),
        };
        page.reload();
        Activation::Active(page)
    }

    /// Re-derive every list from storage.
    pub fn reload(&mut self) {
        self.posts = filter_owned(self.store.read(Collection::Posts), &self.address);
        self.drafts = filter_owned(
            self.store.read::<Owned<Draft>>(Collection::Drafts),
            &self.address,
        )
        .into_iter()
        .map(|row| row.record)
        .collect();
        self.ongoing = filter_owned(
            self.store.read(Collection::OngoingInscriptions),
            &self.address,
        );
        debug!(
            "account {}: {} posts, {} drafts, {} ongoing",
            self.address,
            self.posts.len(),
            self.drafts.len(),
            self.ongoing.len()
        );
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn ongoing(&self) -> &[InscriptionOrder] {
        &self.ongoing
    }

    pub fn store(&self) -> &LocalStore<S> {
        &self.store
    }

    /// Hand the draft `id` to the editor.
    pub fn edit_draft(
        &self,
        id: &str,
        navigator: &mut impl Navigator,
    ) -> Result<(), AccountError> {
        let draft = self
            .drafts
            .iter()
            .find(|draft| draft.id == id)
            .ok_or_else(|| AccountError::UnknownDraft(id.to_string()))?;
        navigator.navigate(Route::Editor {
            draft: Some(draft.clone()),
        });
        Ok(())
    }

    /// Open the editor on a blank draft.
    pub fn new_draft(&self, navigator: &mut impl Navigator) {
        navigator.navigate(Route::Editor { draft: None });
    }

    /// Delete the draft `id` owned by the active address.
    ///
    /// Only persisted rows matching both `id` and the active address are
    /// removed. Returns whether any row was removed from storage.
    pub fn delete_draft(&mut self, id: &str) -> Result<bool, AccountError> {
        let rows = self.store.read_raw(Collection::Drafts)?;
        let before = rows.len();
        let kept: Vec<Value> = rows
            .into_iter()
            .filter(|row| {
                !(field_is(row, "id", id) && field_is(row, "address", self.address.as_str()))
            })
            .collect();
        let removed = before - kept.len();

        if removed > 0 {
            self.store.write(Collection::Drafts, &kept)?;
            info!("deleted draft {id} for {}", self.address);
        } else {
            debug!("draft {id} not stored for {}", self.address);
        }

        self.drafts.retain(|draft| draft.id != id);
        Ok(removed > 0)
    }

    /// Record a freshly created order as ongoing for the active address.
    pub fn track_order(&mut self, order: &OrderDescriptor) -> Result<(), AccountError> {
        let fields = descriptor_fields(order)?;
        let entry = InscriptionOrder {
            order_id: order.order_id.clone(),
            address: self.address.clone(),
            status: fields,
        };

        let mut rows = self.store.read_raw(Collection::OngoingInscriptions)?;
        let existing = rows.iter_mut().find(|row| {
            field_is(row, "orderId", &entry.order_id)
                && field_is(row, "address", self.address.as_str())
        });
        let value = serde_json::to_value(&entry).map_err(|source| crate::StoreError::Encode {
            key: Collection::OngoingInscriptions.key().to_string(),
            source,
        })?;
        match existing {
            Some(row) => *row = value,
            None => rows.push(value),
        }
        self.store.write(Collection::OngoingInscriptions, &rows)?;

        match self.ongoing.iter_mut().find(|o| o.order_id == entry.order_id) {
            Some(slot) => *slot = entry,
            None => self.ongoing.push(entry),
        }
        Ok(())
    }

    /// Merge a status report into the tracked order it refers to.
    pub fn refresh_order(&mut self, status: &StatusDescriptor) -> Result<(), AccountError> {
        let fields = descriptor_fields(status)?;
        let order_id = status.order_id.as_str();

        let mut rows = self.store.read_raw(Collection::OngoingInscriptions)?;
        let mut found = false;
        for row in rows.iter_mut().filter(|row| {
            field_is(row, "orderId", order_id) && field_is(row, "address", self.address.as_str())
        }) {
            if let Value::Object(stored) = row {
                stored.extend(fields.clone());
                found = true;
            }
        }
        if !found {
            return Err(AccountError::UnknownOrder(order_id.to_string()));
        }
        self.store.write(Collection::OngoingInscriptions, &rows)?;

        for order in self.ongoing.iter_mut().filter(|o| o.order_id == order_id) {
            order.status.extend(fields.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn seeded(drafts: Value) -> MemoryStore {
        let backend = MemoryStore::new();
        backend.set("drafts", &drafts.to_string()).expect("seed");
        backend
    }

    fn page<'a>(backend: &'a MemoryStore, address: &str) -> AccountPage<&'a MemoryStore> {
        AccountPage::activate(
            &Session::new(Some(address.into())),
            LocalStore::new(backend),
        )
        .active()
        .expect("active")
    }

    #[test]
    fn anonymous_session_redirects_home() {
        let backend = seeded(json!([{"id": "1", "address": "X"}]));
        match AccountPage::activate(&Session::anonymous(), LocalStore::new(&backend)) {
            Activation::Redirect(route) => assert_eq!(route, Route::Home),
            Activation::Active(_) => panic!("expected redirect"),
        }
    }

    #[test]
    fn filter_keeps_relative_order() {
        let rows: Vec<Post> = ["A", "B", "A", "C", "A"]
            .iter()
            .enumerate()
            .map(|(i, a)| Owned {
                address: (*a).into(),
                record: Draft::new(i.to_string(), "", "", ""),
            })
            .collect();
        let ids: Vec<String> = filter_owned(rows, &"A".into())
            .into_iter()
            .map(|p| p.record.id)
            .collect();
        assert_eq!(ids, ["0", "2", "4"]);
    }

    #[test]
    fn delete_leaves_other_addresses_alone() {
        let backend = seeded(json!([
            {"id": "1", "address": "X", "title": "mine"},
            {"id": "1", "address": "Y", "title": "same id"},
            {"id": "2", "address": "X", "title": "keep"}
        ]));
        let mut page = page(&backend, "X");
        assert_eq!(page.drafts().len(), 2);

        assert!(page.delete_draft("1").expect("delete"));

        let stored: Value =
            serde_json::from_str(&backend.get("drafts").expect("get").expect("present")).expect("json");
        assert_eq!(
            stored,
            json!([
                {"id": "1", "address": "Y", "title": "same id"},
                {"id": "2", "address": "X", "title": "keep"}
            ])
        );
        let ids: Vec<&str> = page.drafts().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["2"]);
    }

    #[test]
    fn deleting_unknown_draft_does_not_write() {
        let backend = seeded(json!([{"id": "1", "address": "Y"}]));
        let before = backend.get("drafts").expect("get");
        let mut page = page(&backend, "X");
        assert!(!page.delete_draft("1").expect("delete"));
        assert_eq!(backend.get("drafts").expect("get"), before);
    }

    #[test]
    fn delete_refuses_to_overwrite_malformed_collection() {
        let backend = MemoryStore::new();
        backend.set("drafts", "[{broken").expect("seed");
        let mut page = page(&backend, "X");
        assert!(page.drafts().is_empty());
        assert!(matches!(page.delete_draft("1"), Err(AccountError::Store(_))));
        assert_eq!(backend.get("drafts").expect("get").as_deref(), Some("[{broken"));
    }

    #[test]
    fn edit_hands_draft_to_editor() {
        let backend = seeded(json!([{"id": "1", "address": "X", "title": "t", "content": "c"}]));
        let page = page(&backend, "X");
        let mut routes = Vec::new();
        page.edit_draft("1", &mut routes).expect("edit");
        page.new_draft(&mut routes);
        assert_eq!(
            routes,
            vec![
                Route::Editor {
                    draft: Some(Draft::new("1", "t", "", "c"))
                },
                Route::Editor { draft: None },
            ]
        );
        assert!(matches!(
            page.edit_draft("9", &mut routes),
            Err(AccountError::UnknownDraft(id)) if id == "9"
        ));
    }

    #[test]
    fn route_serializes_with_tag() {
        let route = Route::Editor {
            draft: Some(Draft::new("1", "t", "d", "c")),
        };
        assert_eq!(
            serde_json::to_value(&route).expect("encode"),
            json!({"route": "editor", "draft": {"id": "1", "title": "t", "date": "d", "content": "c"}})
        );
        assert_eq!(serde_json::to_value(Route::Home).expect("encode"), json!({"route": "home"}));
    }
}
