//! Playback controller: the state machine owning the track list, the play
//! queue, the live stream and the pause/loop flags.
//!
//! Every mutation goes through `Player::apply` with a [`PlayerAction`]; the
//! reactive driving step lives in `player::drive`.

mod drive;
mod model;

pub use model::*;
