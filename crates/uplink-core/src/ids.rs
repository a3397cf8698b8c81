//! Identifier newtypes.
//!
//! Ideas, users and opportunities are owned by the platform database, which
//! hands out integer keys. The newtypes keep them from being mixed up.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }

    impl From<i64> for $name {
      fn from(v: i64) -> Self { Self(v) }
    }
  };
}

id_type!(
  /// An idea submitted by an innovator.
  IdeaId
);
id_type!(
  /// A platform user; the owner of ideas and of notification connections.
  UserId
);
id_type!(
  /// A challenge, investor or company an idea can be matched against.
  OpportunityId
);
