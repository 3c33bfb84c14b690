//! Deterministic encoders turning grid coordinates into one-hot feature vectors.
//!
//! Both encoders emit a row block followed by a column block.
//!
//! ```rust
//! use qnetwork::encoders::{SingleRoomEncoder, StateEncoder};
//! use ndarray::array;
//!
//! let encoder = SingleRoomEncoder::new(3);
//! assert_eq!(
//!     encoder.convert_state_to_agent_format((4, 4)),
//!     array![0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
//! );
//! ```

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

/// A `(row, column)` position in the environment.
pub type Coordinates = (i64, i64);

/// Maps a raw observation to the feature vector the estimator consumes.
pub trait StateEncoder {
    fn convert_state_to_agent_format(&self, state: Coordinates) -> Array1<f32>;

    /// Length of every vector this encoder produces.
    fn output_len(&self) -> usize;
}

fn row_col_one_hot(block: usize, row: usize, col: usize) -> Array1<f32> {
    let mut encoded = Array1::zeros(2 * block);
    encoded.slice_mut(s![..block])[row] = 1.0;
    encoded.slice_mut(s![block..])[col] = 1.0;
    encoded
}

/// Position within the current room, for a world tiled with identical rooms.
///
/// Coordinates are reduced modulo `room_size` (always to a non-negative
/// residue) before one-hot encoding, so the output has length `2 * room_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRoomEncoder {
    pub room_size: usize,
}

impl SingleRoomEncoder {
    pub fn new(room_size: usize) -> Self {
        SingleRoomEncoder { room_size }
    }
}

impl StateEncoder for SingleRoomEncoder {
    fn convert_state_to_agent_format(&self, (row, col): Coordinates) -> Array1<f32> {
        let size = self.room_size as i64;
        row_col_one_hot(
            self.room_size,
            row.rem_euclid(size) as usize,
            col.rem_euclid(size) as usize,
        )
    }

    fn output_len(&self) -> usize {
        2 * self.room_size
    }
}

/// Absolute position in a world of `num_rooms` rooms per side.
///
/// Coordinates must already lie in `[0, room_size * num_rooms)`; anything else
/// panics when indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRoomEncoder {
    pub room_size: usize,
    pub num_rooms: usize,
}

impl MultiRoomEncoder {
    pub fn new(room_size: usize, num_rooms: usize) -> Self {
        MultiRoomEncoder { room_size, num_rooms }
    }

    fn extent(&self) -> usize {
        self.room_size * self.num_rooms
    }
}

impl StateEncoder for MultiRoomEncoder {
    fn convert_state_to_agent_format(&self, (row, col): Coordinates) -> Array1<f32> {
        row_col_one_hot(self.extent(), row as usize, col as usize)
    }

    fn output_len(&self) -> usize {
        2 * self.extent()
    }
}
