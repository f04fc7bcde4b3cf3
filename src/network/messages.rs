use serde::{Deserialize, Serialize};

use crate::battle::{BattleState, Move, Player};

/// Fixed discriminant tag carried by every wire message.
///
/// There is no protocol version negotiation; the tag only guards against a
/// foreign application talking on the same transport. A mismatched tag is
/// dropped by the receiving session without decoding further meaning into it.
pub const WIRE_MAGIC: u16 = 0xB0B5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MessageHeader {
    pub magic: u16,
}

impl Default for MessageHeader {
    fn default() -> Self {
        Self { magic: WIRE_MAGIC }
    }
}

/// The closed set of intents and replications peers exchange.
///
/// `PlayerJoin` and `PlayerAttack` flow follower → host; `Snapshot` flows
/// host → followers. Each message is created by one peer, consumed once by
/// the receiver, and discarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MessageBody {
    /// "Admit me with this identity and these moves."
    PlayerJoin(Player),
    /// "I act with this move." The actor is implicit: the host resolves it
    /// from its peer-identity map, never from the payload.
    PlayerAttack(Move),
    /// "This is now the canonical state; replace your copy."
    Snapshot(BattleState),
}

/// A message exchanged between peers, self-describing via its body's
/// discriminant and guarded by the [`WIRE_MAGIC`] header tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub(crate) header: MessageHeader,
    pub(crate) body: MessageBody,
}

impl Message {
    /// Wraps a body with the current wire tag.
    #[must_use]
    pub fn new(body: MessageBody) -> Self {
        Self {
            header: MessageHeader::default(),
            body,
        }
    }

    /// Whether the message carries the wire tag this build speaks.
    #[must_use]
    pub fn is_well_tagged(&self) -> bool {
        self.header.magic == WIRE_MAGIC
    }

    /// The message body.
    #[must_use]
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Consumes the message, returning its body.
    #[must_use]
    pub fn into_body(self) -> MessageBody {
        self.body
    }
}
