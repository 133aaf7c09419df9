use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

use shared::domain::PlayerId;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionId(pub(crate) Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery target once the requesting connection is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    All,
    Dealers,
    Player(PlayerId),
    Connection(ConnectionId),
}

#[derive(Debug, Default, Clone)]
struct Registration {
    dealer: bool,
    players: BTreeSet<PlayerId>,
}

/// Which role each open connection registered for.
#[derive(Debug, Default, Clone)]
pub(crate) struct Roster {
    connections: Arc<RwLock<HashMap<ConnectionId, Registration>>>,
}

impl Roster {
    pub(crate) fn join(&self, id: ConnectionId) {
        self.write().insert(id, Registration::default());
    }

    pub(crate) fn leave(&self, id: ConnectionId) {
        self.write().remove(&id);
    }

    pub(crate) fn register_dealer(&self, id: ConnectionId) {
        self.write().entry(id).or_default().dealer = true;
    }

    pub(crate) fn register_player(&self, id: ConnectionId, player_id: PlayerId) {
        self.write().entry(id).or_default().players.insert(player_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    pub(crate) fn dealer_count(&self) -> usize {
        self.read().values().filter(|reg| reg.dealer).count()
    }

    /// Whether `id` should receive an event addressed to `target`.
    pub(crate) fn accepts(&self, id: ConnectionId, target: &Target) -> bool {
        match target {
            Target::All => true,
            Target::Connection(conn) => *conn == id,
            Target::Dealers => self.read().get(&id).is_some_and(|reg| reg.dealer),
            Target::Player(player_id) => self
                .read()
                .get(&id)
                .is_some_and(|reg| reg.players.contains(player_id)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ConnectionId, Registration>> {
        self.connections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ConnectionId, Registration>> {
        self.connections.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: &str) -> PlayerId {
        PlayerId(raw.to_string())
    }

    #[test]
    fn unregistered_connection_only_sees_broadcasts_and_its_own_replies() {
        let roster = Roster::default();
        let conn = ConnectionId::new();
        let other = ConnectionId::new();
        roster.join(conn);

        assert!(roster.accepts(conn, &Target::All));
        assert!(roster.accepts(conn, &Target::Connection(conn)));
        assert!(!roster.accepts(conn, &Target::Connection(other)));
        assert!(!roster.accepts(conn, &Target::Dealers));
        assert!(!roster.accepts(conn, &Target::Player(pid("p1"))));
    }

    #[test]
    fn registrations_open_dealer_and_player_channels() {
        let roster = Roster::default();
        let dealer = ConnectionId::new();
        let player = ConnectionId::new();
        roster.join(dealer);
        roster.join(player);
        roster.register_dealer(dealer);
        roster.register_player(player, pid("p1"));

        assert!(roster.accepts(dealer, &Target::Dealers));
        assert!(!roster.accepts(player, &Target::Dealers));
        assert!(roster.accepts(player, &Target::Player(pid("p1"))));
        assert!(!roster.accepts(player, &Target::Player(pid("p2"))));
        assert!(!roster.accepts(dealer, &Target::Player(pid("p1"))));
        assert_eq!(roster.dealer_count(), 1);
    }

    #[test]
    fn leaving_drops_registrations() {
        let roster = Roster::default();
        let conn = ConnectionId::new();
        roster.join(conn);
        roster.register_dealer(conn);
        roster.leave(conn);

        assert_eq!(roster.len(), 0);
        assert!(!roster.accepts(conn, &Target::Dealers));
    }
}
