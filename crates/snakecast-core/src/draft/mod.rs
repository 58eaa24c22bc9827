// Snake-draft board construction, observer windows, and live draft state.

pub mod board;
pub mod pick;
pub mod state;
pub mod window;
