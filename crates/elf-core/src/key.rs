//! Key encoding: `query_id = ((thread_id + 1) << 24) | (game_id & 0xFFFFFF)`.
//!
//! `thread_id == -1` is the "main query" of a game and encodes to the same
//! bits as `thread_id == 0`'s upper byte minus one, i.e. the upper byte is 0.

/// Dense key identifying one producer (one game, or one sub-thread of a game).
///
/// Total ordering is irrelevant; only uniqueness per process matters, so this
/// is a plain type alias rather than a newtype — it is used as a `HashMap`
/// key and as the payload moved through every queue in the crate.
pub type Key = u32;

const THREAD_SHIFT: u32 = 24;
const GAME_MASK: u32 = 0x00FF_FFFF;

/// Computes the `query_id` for a `(game_id, thread_id)` pair.
///
/// `thread_id = -1` is the game's own main query; `thread_id >= 0` identifies
/// a spawned sub-agent thread within the same game.
#[must_use]
pub fn encode(game_id: u32, thread_id: i32) -> Key {
    debug_assert!(game_id & !GAME_MASK == 0, "game_id must fit in 24 bits");
    let thread_bits = (thread_id + 1) as u32;
    (thread_bits << THREAD_SHIFT) | (game_id & GAME_MASK)
}

/// Inverse of [`encode`]; mostly useful for diagnostics and tests.
#[must_use]
pub fn decode(key: Key) -> (u32, i32) {
    let game_id = key & GAME_MASK;
    let thread_bits = key >> THREAD_SHIFT;
    (game_id, thread_bits as i32 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_query_has_zero_upper_byte() {
        let key = encode(42, -1);
        assert_eq!(key >> THREAD_SHIFT, 0);
        assert_eq!(decode(key), (42, -1));
    }

    #[test]
    fn child_threads_are_distinguished() {
        let main = encode(7, -1);
        let child0 = encode(7, 0);
        let child1 = encode(7, 1);
        assert_ne!(main, child0);
        assert_ne!(child0, child1);
        assert_eq!(decode(child0), (7, 0));
        assert_eq!(decode(child1), (7, 1));
    }

    #[test]
    fn round_trip_over_range() {
        for game_id in [0u32, 1, 1000, 0x00FF_FFFF] {
            for thread_id in -1..4 {
                assert_eq!(decode(encode(game_id, thread_id)), (game_id, thread_id));
            }
        }
    }
}

/// Identifies one producer within a game: the game's own id, the producer's
/// thread id within that game, and the derived [`Key`] used everywhere else.
///
/// Parent/child relations form a tree: a spawned sub-agent keeps the parent's
/// `id` and only changes `thread_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaInfo {
    pub id: u32,
    pub thread_id: i32,
    pub query_id: Key,
}

impl MetaInfo {
    /// Builds the `MetaInfo` for a game's own main query.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            thread_id: -1,
            query_id: encode(id, -1),
        }
    }

    /// Builds the `MetaInfo` for a sub-agent thread spawned from `parent`.
    #[must_use]
    pub fn child(parent: &MetaInfo, thread_id: i32) -> Self {
        Self {
            id: parent.id,
            thread_id,
            query_id: encode(parent.id, thread_id),
        }
    }
}
