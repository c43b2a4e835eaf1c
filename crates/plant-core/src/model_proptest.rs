#[cfg(test)]
mod proptest_model {
    use crate::model::ProcessModel;
    use crate::process::{ActuatorState, ProcessState};
    use proptest::prelude::*;

    fn any_actuators() -> impl Strategy<Value = ActuatorState> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(pump, valve, heater)| {
            ActuatorState {
                pump_running: pump,
                valve_open: valve,
                heater_on: heater,
            }
        })
    }

    fn reachable_state() -> impl Strategy<Value = ProcessState> {
        (
            20.0f64..=100.0,
            50.0f64..=150.0,
            0.0f64..=85.0,
            0.0f64..=100.0,
        )
            .prop_map(|(temperature, pressure, flow_rate, tank_level)| ProcessState {
                temperature,
                pressure,
                flow_rate,
                tank_level,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Every advance lands inside the operating envelope.
        #[test]
        fn advance_stays_in_bounds(
            seed in any::<u64>(),
            start in reachable_state(),
            schedule in prop::collection::vec(any_actuators(), 1..50),
            dt in 0.0f64..=30.0,
        ) {
            let mut model = ProcessModel::with_seed(seed);
            let mut state = start;
            for act in &schedule {
                state = model.advance(&state, act, dt);
                prop_assert!(state.check_bounds().is_ok(), "{:?} after {:?}", state, act);
            }
        }

        // Arbitrary, even out-of-range, input is pulled back into range.
        #[test]
        fn advance_repairs_wild_input(
            seed in any::<u64>(),
            temperature in -1e6f64..1e6,
            pressure in -1e6f64..1e6,
            flow_rate in -1e6f64..1e6,
            tank_level in -1e6f64..1e6,
            act in any_actuators(),
        ) {
            let mut model = ProcessModel::with_seed(seed);
            let wild = ProcessState { temperature, pressure, flow_rate, tank_level };
            let next = model.advance(&wild, &act, 1.0);
            prop_assert!(next.check_bounds().is_ok(), "{:?}", next);
        }

        // Pump and valve together, or neither, leave the level untouched.
        #[test]
        fn level_holds_when_balanced(
            seed in any::<u64>(),
            start in reachable_state(),
            both in any::<bool>(),
            heater in any::<bool>(),
            steps in 1usize..200,
        ) {
            let mut model = ProcessModel::with_seed(seed);
            let act = ActuatorState { pump_running: both, valve_open: both, heater_on: heater };
            let mut state = start;
            for _ in 0..steps {
                state = model.advance(&state, &act, 1.0);
            }
            prop_assert!((state.tank_level - start.tank_level).abs() < 1e-9);
        }
    }
}
