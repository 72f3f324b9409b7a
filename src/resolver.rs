use thiserror::Error;
use tracing::{debug, info};

use crate::client::{ClientError, Dialog, Entity, MessagingClient, PeerRef};
use crate::layout;

pub const DIALOG_FETCH_LIMIT: usize = 200;

pub const SCORE_PHONE_EXACT: u32 = 140;
pub const SCORE_USERNAME_EXACT: u32 = 130;
pub const SCORE_NAME_EXACT: u32 = 120;
pub const SCORE_PHONE_SUFFIX: u32 = 110;
pub const SCORE_USERNAME_PREFIX: u32 = 100;
pub const SCORE_NAME_PREFIX: u32 = 95;
pub const SCORE_PHONE_CONTAINS: u32 = 85;
pub const SCORE_USERNAME_CONTAINS: u32 = 80;
pub const SCORE_NAME_CONTAINS: u32 = 75;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Cannot find user/chat: {0}")]
    NotFound(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Clone, Debug)]
pub struct Query {
    text: String,
    digits: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            text: normalize(raw),
            digits: digits_only(raw),
        }
    }

    fn handle(&self) -> &str {
        self.text.strip_prefix('@').unwrap_or(&self.text)
    }
}

#[derive(Clone, Debug)]
pub struct Match<'a> {
    pub dialog: &'a Dialog,
    pub score: u32,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct Resolution {
    pub peer: PeerRef,
    pub label: String,
    pub entity: Entity,
    pub dialog: Option<Dialog>,
}

impl Resolution {
    /// Group/channel title, the user's name, then the resolved label.
    pub fn conversation_name(&self) -> String {
        match &self.entity {
            Entity::Group(_) | Entity::Channel(_) => self.entity.title().map(str::to_string),
            Entity::User(_) => self.entity.full_name().filter(|name| !name.is_empty()),
        }
        .map(|name| layout::sanitize_line(&name))
        .unwrap_or_else(|| self.label.clone())
    }

    pub fn phone_label(&self) -> String {
        match self.entity.phone() {
            Some(phone) => format!("+{}", layout::sanitize_line(phone)),
            None => "-".to_string(),
        }
    }
}

/// Rules run top to bottom and the first hit wins, so a phone suffix (110)
/// beats a username prefix (100) even when both apply.
pub fn score_query(query: &Query, dialog: &Dialog) -> u32 {
    let name = normalize(&dialog.display_name());
    let username = dialog.entity.username().map(normalize).unwrap_or_default();
    let username_with_at = if username.is_empty() {
        String::new()
    } else {
        format!("@{username}")
    };
    let phone_digits = dialog
        .entity
        .phone()
        .map(|phone| digits_only(&format!("+{phone}")))
        .unwrap_or_default();

    let text = query.text.as_str();
    let digits = query.digits.as_str();
    let handle = query.handle();
    let has_text = !text.is_empty();
    let phone_ok = !digits.is_empty() && !phone_digits.is_empty();
    let username_ok = has_text && !username.is_empty();
    let name_ok = has_text && !name.is_empty();

    if phone_ok && digits == phone_digits {
        return SCORE_PHONE_EXACT;
    }
    if username_ok && (text == username || text == username_with_at) {
        return SCORE_USERNAME_EXACT;
    }
    if name_ok && text == name {
        return SCORE_NAME_EXACT;
    }

    if phone_ok && phone_digits.ends_with(digits) {
        return SCORE_PHONE_SUFFIX;
    }
    if username_ok && username.starts_with(handle) {
        return SCORE_USERNAME_PREFIX;
    }
    if name_ok && name.starts_with(text) {
        return SCORE_NAME_PREFIX;
    }

    if phone_ok && phone_digits.contains(digits) {
        return SCORE_PHONE_CONTAINS;
    }
    if username_ok && username.contains(handle) {
        return SCORE_USERNAME_CONTAINS;
    }
    if name_ok && name.contains(text) {
        return SCORE_NAME_CONTAINS;
    }

    0
}

pub fn rank<'a>(query: &str, dialogs: &'a [Dialog]) -> Vec<Match<'a>> {
    let query = Query::new(query);
    let mut matches: Vec<Match<'a>> = dialogs
        .iter()
        .enumerate()
        .map(|(index, dialog)| Match {
            dialog,
            score: score_query(&query, dialog),
            index,
        })
        .filter(|candidate| candidate.score > 0)
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
    matches
}

pub async fn resolve<C: MessagingClient>(client: &C, query: &str) -> Result<Resolution, ResolveError> {
    let dialogs = client.list_dialogs(DIALOG_FETCH_LIMIT).await?;

    if let Some(best) = rank(query, &dialogs).into_iter().next() {
        let label = best.dialog.display_name();
        debug!(query, score = best.score, index = best.index, %label, "matched dialog");
        return Ok(Resolution {
            peer: best.dialog.peer(),
            label,
            entity: best.dialog.entity.clone(),
            dialog: Some(best.dialog.clone()),
        });
    }

    info!(query, dialogs = dialogs.len(), "no dialog matched, falling back to entity lookup");
    match client.lookup_entity(query).await {
        Ok(entity) => Ok(Resolution {
            peer: entity.peer(),
            label: query.to_string(),
            entity,
            dialog: None,
        }),
        Err(ClientError::NotFound(_) | ClientError::Api { .. }) => {
            Err(ResolveError::NotFound(query.to_string()))
        }
        Err(error) => Err(error.into()),
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Group, Message, SentMessage, User};
    use std::cell::RefCell;

    fn score(query: &str, dialog: &Dialog) -> u32 {
        score_query(&Query::new(query), dialog)
    }

    fn user_dialog(name: &str, username: &str, phone: &str) -> Dialog {
        Dialog {
            name: (!name.is_empty()).then(|| name.to_string()),
            title: None,
            entity: Entity::User(User {
                id: (name.len() + username.len()) as i64,
                access_hash: None,
                first_name: None,
                last_name: None,
                username: (!username.is_empty()).then(|| username.to_string()),
                phone: (!phone.is_empty()).then(|| phone.to_string()),
            }),
            unread_count: 0,
            unread_mentions_count: 0,
        }
    }

    struct FakeClient {
        dialogs: Vec<Dialog>,
        directory: Vec<(String, Entity)>,
        lookup_error: Option<fn() -> ClientError>,
        lookups: RefCell<Vec<String>>,
        dialog_limits: RefCell<Vec<usize>>,
    }

    impl FakeClient {
        fn new(dialogs: Vec<Dialog>) -> Self {
            Self {
                dialogs,
                directory: Vec::new(),
                lookup_error: None,
                lookups: RefCell::new(Vec::new()),
                dialog_limits: RefCell::new(Vec::new()),
            }
        }
    }

    impl MessagingClient for FakeClient {
        async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError> {
            self.dialog_limits.borrow_mut().push(limit);
            Ok(self.dialogs.iter().take(limit).cloned().collect())
        }

        async fn lookup_entity(&self, identifier: &str) -> Result<Entity, ClientError> {
            self.lookups.borrow_mut().push(identifier.to_string());
            if let Some(make_error) = self.lookup_error {
                return Err(make_error());
            }
            self.directory
                .iter()
                .find(|(key, _)| key == identifier)
                .map(|(_, entity)| entity.clone())
                .ok_or_else(|| ClientError::NotFound(identifier.to_string()))
        }

        async fn get_messages(&self, _peer: &PeerRef, _limit: usize) -> Result<Vec<Message>, ClientError> {
            Ok(Vec::new())
        }

        async fn send_message(&self, _peer: &PeerRef, _text: &str) -> Result<SentMessage, ClientError> {
            Ok(SentMessage { id: 1 })
        }
    }

    #[test]
    fn exact_username_beats_prefix_beats_substring() {
        let exact = user_dialog("Someone", "alice", "");
        let prefix = user_dialog("Someone", "alice2023", "");
        let inner = user_dialog("Someone", "xalice", "");
        assert_eq!(score("alice", &exact), SCORE_USERNAME_EXACT);
        assert_eq!(score("alice", &prefix), SCORE_USERNAME_PREFIX);
        assert_eq!(score("alice", &inner), SCORE_USERNAME_CONTAINS);
        assert_eq!(score("@Alice", &exact), SCORE_USERNAME_EXACT);
        assert_eq!(score("@ali", &prefix), SCORE_USERNAME_PREFIX);
    }

    #[test]
    fn phone_tiers_compare_digits_only() {
        let dialog = user_dialog("Alice Young", "alicey", "15559998888");
        assert_eq!(score("+1 (555) 999-8888", &dialog), SCORE_PHONE_EXACT);
        assert_eq!(score("+5559998888", &dialog), SCORE_PHONE_SUFFIX);
        assert_eq!(score("5999", &dialog), SCORE_PHONE_CONTAINS);
        assert_eq!(score("+44 20", &dialog), 0);
    }

    #[test]
    fn name_tiers_are_case_insensitive() {
        let dialog = user_dialog("Alice Young", "ay", "");
        assert_eq!(score("  alice young ", &dialog), SCORE_NAME_EXACT);
        assert_eq!(score("ALI", &dialog), SCORE_NAME_PREFIX);
        assert_eq!(score("young", &dialog), SCORE_NAME_CONTAINS);
        assert_eq!(score("bob", &dialog), 0);
        assert_eq!(score("", &dialog), 0);
    }

    #[test]
    fn first_rule_in_table_order_wins_across_families() {
        // Digits "12" are a phone suffix and the text is also a username prefix.
        let dialog = user_dialog("Zed", "12ab", "99912");
        assert_eq!(score("12", &dialog), SCORE_PHONE_SUFFIX);
    }

    #[test]
    fn group_dialog_scores_by_title_only() {
        let dialog = Dialog {
            name: None,
            title: Some("Rust Berlin".to_string()),
            entity: Entity::Group(Group {
                id: 5,
                title: Some("Rust Berlin".to_string()),
            }),
            unread_count: 0,
            unread_mentions_count: 0,
        };
        assert_eq!(score("rust berlin", &dialog), SCORE_NAME_EXACT);
        assert_eq!(score("-100123", &dialog), 0);
    }

    #[test]
    fn rank_orders_by_score_then_dialog_index() {
        let dialogs = vec![
            user_dialog("Bob", "bob", ""),
            user_dialog("Zed", "alina", ""),
            user_dialog("Carl", "carl", ""),
            user_dialog("Yan", "alice", ""),
            user_dialog("Ali", "someone", ""),
        ];
        let ranked = rank("ali", &dialogs);
        let order: Vec<(usize, u32)> = ranked.iter().map(|m| (m.index, m.score)).collect();
        assert_eq!(order, vec![(4, SCORE_NAME_EXACT), (1, SCORE_USERNAME_PREFIX), (3, SCORE_USERNAME_PREFIX)]);
    }

    #[tokio::test]
    async fn tie_resolves_to_earlier_dialog() {
        let client = FakeClient::new(vec![
            user_dialog("Bob", "bob", ""),
            user_dialog("Zed", "alina", ""),
            user_dialog("Carl", "carl", ""),
            user_dialog("Yan", "alice", ""),
        ]);
        let resolution = resolve(&client, "ali").await.expect("resolution");
        assert_eq!(resolution.label, "Zed");
        assert_eq!(resolution.dialog.as_ref(), Some(&client.dialogs[1]));
        assert!(client.lookups.borrow().is_empty());
        assert_eq!(*client.dialog_limits.borrow(), vec![DIALOG_FETCH_LIMIT]);
    }

    #[tokio::test]
    async fn phone_suffix_resolves_alice() {
        let client = FakeClient::new(vec![
            user_dialog("Bob Lee", "boblee", "15551230000"),
            user_dialog("Alice Young", "alicey", "15559998888"),
        ]);
        assert_eq!(score("+5559998888", &client.dialogs[0]), 0);
        let resolution = resolve(&client, "+5559998888").await.expect("resolution");
        assert_eq!(resolution.label, "Alice Young");
        assert_eq!(resolution.peer, client.dialogs[1].peer());
        assert_eq!(resolution.phone_label(), "+15559998888");
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_one_lookup_with_raw_string() {
        let mut client = FakeClient::new(vec![
            user_dialog("Bob Lee", "boblee", "15551230000"),
            user_dialog("Alice Young", "alicey", "15559998888"),
        ]);
        let stranger = Entity::User(User {
            id: 77,
            access_hash: Some(1),
            first_name: Some("New".to_string()),
            last_name: Some("Contact".to_string()),
            username: None,
            phone: Some("19995551234".to_string()),
        });
        client.directory.push(("+19995551234".to_string(), stranger.clone()));

        let resolution = resolve(&client, "+19995551234").await.expect("resolution");
        assert_eq!(*client.lookups.borrow(), vec!["+19995551234".to_string()]);
        assert_eq!(resolution.label, "+19995551234");
        assert_eq!(resolution.entity, stranger);
        assert!(resolution.dialog.is_none());
        assert_eq!(resolution.conversation_name(), "New Contact");
    }

    #[tokio::test]
    async fn failed_lookup_is_not_found_with_raw_query() {
        let client = FakeClient::new(vec![user_dialog("Bob Lee", "boblee", "")]);
        let error = resolve(&client, "@ghost").await.expect_err("should fail");
        assert!(matches!(&error, ResolveError::NotFound(query) if query == "@ghost"));
        assert_eq!(error.to_string(), "Cannot find user/chat: @ghost");
        assert_eq!(client.lookups.borrow().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_during_lookup_propagates() {
        let mut client = FakeClient::new(Vec::new());
        client.lookup_error = Some(|| ClientError::Status(502));
        let error = resolve(&client, "-100123456789").await.expect_err("should fail");
        assert!(matches!(error, ResolveError::Client(ClientError::Status(502))));
    }

    #[test]
    fn conversation_name_prefers_title_for_groups() {
        let resolution = Resolution {
            peer: PeerRef {
                kind: crate::client::PeerKind::Group,
                id: 9,
                access_hash: None,
            },
            label: "-9".to_string(),
            entity: Entity::Group(Group {
                id: 9,
                title: Some("Team".to_string()),
            }),
            dialog: None,
        };
        assert_eq!(resolution.conversation_name(), "Team");
        assert_eq!(resolution.phone_label(), "-");
    }
}
