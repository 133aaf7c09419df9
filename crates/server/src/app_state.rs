use std::sync::Arc;

use server_api::{ApiContext, Audience, Dispatch};
use shared::protocol::ServerEvent;
use tokio::sync::broadcast;

use crate::roster::{ConnectionId, Roster, Target};

/// One event on the shared bus, filtered per connection by the send task.
#[derive(Debug, Clone)]
pub(crate) struct Outbound {
    pub(crate) target: Target,
    pub(crate) event: Arc<ServerEvent>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) events: broadcast::Sender<Outbound>,
    pub(crate) roster: Roster,
}

impl AppState {
    pub(crate) fn new(api: ApiContext, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            api,
            events,
            roster: Roster::default(),
        }
    }

    pub(crate) fn publish(&self, target: Target, event: ServerEvent) {
        // no subscribers is fine
        let _ = self.events.send(Outbound {
            target,
            event: Arc::new(event),
        });
    }

    pub(crate) fn publish_dispatch(&self, origin: ConnectionId, dispatch: Dispatch) {
        let Dispatch { audience, event } = dispatch;
        let target = match audience {
            Audience::All => Target::All,
            Audience::Dealers => Target::Dealers,
            Audience::Player(player_id) => Target::Player(player_id),
            Audience::Origin => Target::Connection(origin),
        };
        self.publish(target, event);
    }
}
