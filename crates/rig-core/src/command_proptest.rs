#[cfg(test)]
mod proptest_command {
    use crate::command::*;
    use crate::timing::StepTiming;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Property: every in-range speed yields a positive delay that shrinks as speed grows
        #[test]
        fn delay_strictly_decreasing_in_range(rpm in MIN_COMMAND_RPM..MAX_COMMAND_RPM) {
            let slower = StepTiming::for_speed(rpm as f64, 200);
            let faster = StepTiming::for_speed((rpm + 1) as f64, 200);
            prop_assert!(!slower.delay().is_zero());
            prop_assert!(
                faster.delay() < slower.delay(),
                "rpm={} delay={:?} rpm+1 delay={:?}", rpm, slower.delay(), faster.delay()
            );
        }

        // Property: values below the range are always rejected
        #[test]
        fn below_range_rejected(rpm in i64::MIN / 2..MIN_COMMAND_RPM) {
            let result = SpeedCommand::new(rpm).validate();
            let is_out_of_range = matches!(result, Err(CommandRejection::OutOfRange { .. }));
            prop_assert!(is_out_of_range, "Expected OutOfRange for {}", rpm);
        }

        // Property: values above the range are always rejected
        #[test]
        fn above_range_rejected(rpm in (MAX_COMMAND_RPM + 1)..i64::MAX / 2) {
            let result = SpeedCommand::new(rpm).validate();
            let is_out_of_range = matches!(result, Err(CommandRejection::OutOfRange { .. }));
            prop_assert!(is_out_of_range, "Expected OutOfRange for {}", rpm);
        }

        // Property: parsing never panics and round-trips plain decimal input
        #[test]
        fn parse_round_trips_decimal(rpm in -100_000i64..100_000, suffix in "[ \r\n,a-z]{0,6}") {
            let raw = format!("{}{}", rpm, suffix);
            prop_assert_eq!(parse_leading_int(&raw), Some(rpm));
        }

        // Property: rejected commands leave target speed and timing untouched
        #[cfg(feature = "simulation")]
        #[test]
        fn rejected_command_keeps_rig_state(
            rpm in prop_oneof![-10_000i64..MIN_COMMAND_RPM, (MAX_COMMAND_RPM + 1)..100_000],
        ) {
            use crate::{RigConstants, SimulatedRig, TestRig};

            let constants = RigConstants::default();
            let mut rig = TestRig::new(SimulatedRig::instant(&constants), constants);
            rig.apply_input("450");
            rig.refresh_timing();
            let before = *rig.state();

            rig.apply_input(&rpm.to_string());
            prop_assert_eq!(rig.state().target_rpm(), before.target_rpm());
            prop_assert_eq!(rig.state().timing(), before.timing());
            prop_assert!(!rig.state().timing_stale());
        }
    }
}
