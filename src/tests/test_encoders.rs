use ndarray::array;
use crate::encoders::{MultiRoomEncoder, SingleRoomEncoder, StateEncoder};

#[test]
fn test_single_room_wraps_coordinates() {
    let encoder = SingleRoomEncoder::new(3);
    assert_eq!(
        encoder.convert_state_to_agent_format((4, 4)),
        array![0.0f32, 1.0, 0.0, 0.0, 1.0, 0.0]
    );
    assert_eq!(
        encoder.convert_state_to_agent_format((0, 8)),
        array![1.0f32, 0.0, 0.0, 0.0, 0.0, 1.0]
    );
}

#[test]
fn test_single_room_same_cell_in_every_room() {
    let encoder = SingleRoomEncoder::new(5);
    let base = encoder.convert_state_to_agent_format((2, 3));
    assert_eq!(encoder.convert_state_to_agent_format((7, 13)), base);
    assert_eq!(encoder.convert_state_to_agent_format((52, 28)), base);
}

#[test]
fn test_single_room_negative_coordinates() {
    let encoder = SingleRoomEncoder::new(4);
    // -1 lies in the last row of the room above.
    assert_eq!(
        encoder.convert_state_to_agent_format((-1, -6)),
        encoder.convert_state_to_agent_format((3, 2))
    );
}

#[test]
fn test_single_room_output_len() {
    let encoder = SingleRoomEncoder::new(6);
    assert_eq!(encoder.output_len(), 12);
    let encoded = encoder.convert_state_to_agent_format((10, 1));
    assert_eq!(encoded.len(), 12);
    assert_eq!(encoded.sum(), 2.0);
}

#[test]
fn test_multi_room_absolute_position() {
    let encoder = MultiRoomEncoder::new(2, 2);
    assert_eq!(encoder.output_len(), 8);
    assert_eq!(
        encoder.convert_state_to_agent_format((3, 0)),
        array![0.0f32, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn test_multi_room_distinguishes_rooms() {
    let encoder = MultiRoomEncoder::new(3, 2);
    assert_ne!(
        encoder.convert_state_to_agent_format((1, 1)),
        encoder.convert_state_to_agent_format((4, 4))
    );
}

#[test]
#[should_panic]
fn test_multi_room_out_of_range_panics() {
    let encoder = MultiRoomEncoder::new(2, 2);
    encoder.convert_state_to_agent_format((4, 0));
}
