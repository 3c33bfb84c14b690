use ndarray::{Array1, Array2};
use proptest::prelude::*;
use qnetwork::agent::{bootstrap_targets, DenseQNetwork, QNetworkConfig};
use qnetwork::builders::DenseBuilder;
use qnetwork::encoders::{MultiRoomEncoder, SingleRoomEncoder, StateEncoder};
use qnetwork::loss::{Aggregation, HuberLoss};

fn one_positions(encoded: &Array1<f32>) -> Vec<usize> {
    encoded
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == 1.0)
        .map(|(i, _)| i)
        .collect()
}

proptest! {
    #[test]
    fn test_single_room_one_hot(
        room_size in 1usize..12,
        row in -1_000_000i64..1_000_000,
        col in -1_000_000i64..1_000_000,
    ) {
        let encoder = SingleRoomEncoder::new(room_size);
        let encoded = encoder.convert_state_to_agent_format((row, col));

        prop_assert_eq!(encoded.len(), 2 * room_size);
        prop_assert!(encoded.iter().all(|&v| v == 0.0 || v == 1.0));
        let size = room_size as i64;
        prop_assert_eq!(
            one_positions(&encoded),
            vec![row.rem_euclid(size) as usize, room_size + col.rem_euclid(size) as usize]
        );
    }

    #[test]
    fn test_single_room_is_periodic(
        room_size in 1usize..12,
        row in -1000i64..1000,
        col in -1000i64..1000,
        shift_rows in -50i64..50,
        shift_cols in -50i64..50,
    ) {
        let encoder = SingleRoomEncoder::new(room_size);
        let size = room_size as i64;
        prop_assert_eq!(
            encoder.convert_state_to_agent_format((row, col)),
            encoder.convert_state_to_agent_format((row + shift_rows * size, col + shift_cols * size))
        );
    }

    #[test]
    fn test_multi_room_one_hot(
        room_size in 1usize..6,
        num_rooms in 1usize..5,
        row_frac in 0.0f64..1.0,
        col_frac in 0.0f64..1.0,
    ) {
        let encoder = MultiRoomEncoder::new(room_size, num_rooms);
        let extent = room_size * num_rooms;
        let row = ((row_frac * extent as f64) as usize).min(extent - 1);
        let col = ((col_frac * extent as f64) as usize).min(extent - 1);

        let encoded = encoder.convert_state_to_agent_format((row as i64, col as i64));
        prop_assert_eq!(encoded.len(), encoder.output_len());
        prop_assert_eq!(one_positions(&encoded), vec![row, extent + col]);
    }

    #[test]
    fn test_huber_loss_properties(diff in -100.0f32..100.0) {
        let huber = HuberLoss::new(1.0, Aggregation::Sum);
        let loss = huber.row_loss(diff);

        prop_assert!(loss >= 0.0);
        prop_assert_eq!(loss, huber.row_loss(-diff));
        prop_assert!(loss <= 0.5 * diff * diff + 1e-6);
        if diff.abs() >= 1.0 {
            prop_assert!((loss - (diff.abs() - 0.5)).abs() < 1e-4);
        }
        prop_assert!(huber.row_slope(diff).abs() <= 1.0);
    }

    #[test]
    fn test_terminal_targets_equal_rewards(
        rewards in prop::collection::vec(-10.0f32..10.0, 1..8),
        scale in prop::sample::select(vec![1.0f32, 1e10, 1e30, f32::INFINITY]),
        discount in 0.0f32..=1.0,
    ) {
        let n = rewards.len();
        let rewards = Array1::from_vec(rewards);
        let terminals = Array1::<f32>::ones(n);
        let next_q = Array2::from_elem((n, 3), scale);

        let targets = bootstrap_targets(rewards.view(), terminals.view(), next_q.view(), discount);
        prop_assert_eq!(targets, rewards);
    }

    #[test]
    fn test_nonterminal_targets_bootstrap(
        reward in -10.0f32..10.0,
        next_q in prop::collection::vec(-10.0f32..10.0, 1..6),
        discount in 0.0f32..=1.0,
    ) {
        let best = next_q.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let actions = next_q.len();
        let next_q = Array2::from_shape_vec((1, actions), next_q).unwrap();
        let targets = bootstrap_targets(
            Array1::from_elem(1, reward).view(),
            Array1::<f32>::zeros(1).view(),
            next_q.view(),
            discount,
        );
        prop_assert!((targets[0] - (reward + discount * best)).abs() < 1e-4);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_q_values_shape_and_finite(
        room_size in 2usize..6,
        num_actions in 1usize..6,
        row in -20i64..20,
        col in -20i64..20,
        seed in any::<u64>(),
    ) {
        let encoder = SingleRoomEncoder::new(room_size);
        let config = QNetworkConfig {
            batch_size: 8,
            num_actions,
            discount: 0.99,
            learning_rate: 1e-3,
            regularization: 1e-4,
            update_rule: "sgd".to_string(),
            freeze_interval: 100,
            seed: Some(seed),
        };
        let mut network = DenseQNetwork::new(DenseBuilder::new(encoder.output_len(), 1, 8), config).unwrap();
        let state = encoder.convert_state_to_agent_format((row, col)).into_dyn();
        let q_values = network.get_q_values(state.view()).unwrap();

        prop_assert_eq!(q_values.len(), num_actions);
        prop_assert!(q_values.iter().all(|q| q.is_finite()));
        prop_assert_eq!(network.update_counter(), 0);
    }
}
