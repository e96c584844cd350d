#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use skyfence_core::components::MotionLimits;
    use skyfence_core::constants::*;
    use skyfence_core::enums::HostileBehavior;
    use skyfence_core::types::{Position, Velocity};

    use crate::fsm::{evaluate, HostileContext};
    use crate::profiles::limits_for_type;

    const DT: f64 = 0.1;

    fn make_context<'a>(
        limits: &'a MotionLimits,
        behavior: HostileBehavior,
        position: Position,
        velocity: Velocity,
        pursuer: Option<(Position, f64)>,
    ) -> HostileContext<'a> {
        HostileContext {
            id: 1,
            position,
            velocity,
            behavior,
            is_evading: behavior == HostileBehavior::Evade,
            limits,
            target_point: None,
            base_pos: Position::default(),
            nearest_pursuer: pursuer,
        }
    }

    #[test]
    fn test_normal_heads_toward_base() {
        let limits = MotionLimits::default();
        let ctx = make_context(
            &limits,
            HostileBehavior::Normal,
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -10.0, 0.0),
            None,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        assert_eq!(update.behavior, HostileBehavior::Normal);
        assert!(update.velocity.y < 0.0, "should fly south toward origin");
        assert!(update.velocity.x.abs() < 1e-9);
    }

    #[test]
    fn test_normal_accelerates_toward_cruise() {
        let limits = MotionLimits::default();
        let ctx = make_context(
            &limits,
            HostileBehavior::Normal,
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -5.0, 0.0),
            None,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        let expected = 5.0 + limits.acceleration * DT;
        assert!((update.velocity.horizontal_speed() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_evasion_triggers_inside_range() {
        let limits = MotionLimits::default();
        let pursuer_pos = Position::new(0.0, 260.0, 80.0);
        let ctx = make_context(
            &limits,
            HostileBehavior::Normal,
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            Some((pursuer_pos, 40.0)),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        assert_eq!(update.behavior, HostileBehavior::Evade);
        assert!(update.is_evading);
        assert_eq!(update.velocity.z.abs(), EVADE_CLIMB_RATE);
    }

    #[test]
    fn test_evasion_not_triggered_outside_range() {
        let limits = MotionLimits::default();
        let pursuer_pos = Position::new(0.0, 200.0, 80.0);
        let ctx = make_context(
            &limits,
            HostileBehavior::Normal,
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            Some((pursuer_pos, 100.0)),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        assert_eq!(update.behavior, HostileBehavior::Normal);
        assert!(!update.is_evading);
    }

    #[test]
    fn test_evasion_reverts_when_pursuer_gone() {
        let limits = MotionLimits::default();
        let ctx = make_context(
            &limits,
            HostileBehavior::Evade,
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(10.0, 10.0, 5.0),
            None,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        assert_eq!(update.behavior, HostileBehavior::Normal);
        assert!(!update.is_evading);
    }

    #[test]
    fn test_evade_breaks_away_from_pursuer() {
        let limits = MotionLimits::default();
        // Pursuer due south of the hostile: escape vector points north,
        // rotated 45 degrees by parity.
        let ctx = make_context(
            &limits,
            HostileBehavior::Evade,
            Position::new(0.0, 100.0, 80.0),
            Velocity::new(0.0, 10.0, 0.0),
            Some((Position::new(0.0, 60.0, 80.0), 40.0)),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let update = evaluate(&ctx, DT, &mut rng);
        assert!(update.velocity.y > 0.0, "should still move away from pursuer");
        assert!(
            update.velocity.x.abs() > 0.0,
            "break angle should add a lateral component"
        );
    }

    #[test]
    fn test_evade_break_side_is_per_vehicle_parity() {
        let limits = MotionLimits::default();
        let pursuer = Some((Position::new(0.0, 60.0, 80.0), 40.0));
        let mut even = make_context(
            &limits,
            HostileBehavior::Evade,
            Position::new(0.0, 100.0, 80.0),
            Velocity::new(0.0, 10.0, 0.0),
            pursuer,
        );
        even.id = 2;
        let mut odd = make_context(
            &limits,
            HostileBehavior::Evade,
            Position::new(0.0, 100.0, 80.0),
            Velocity::new(0.0, 10.0, 0.0),
            pursuer,
        );
        odd.id = 3;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let even_update = evaluate(&even, DT, &mut rng);
        let odd_update = evaluate(&odd, DT, &mut rng);
        assert!(
            even_update.velocity.x * odd_update.velocity.x < 0.0,
            "opposite parities should break to opposite sides"
        );
    }

    #[test]
    fn test_attack_run_forces_low_altitude() {
        let limits = limits_for_type("quad_attack", skyfence_core::enums::SizeClass::Small);
        let ctx = make_context(
            &limits,
            HostileBehavior::AttackRun,
            Position::new(0.0, 400.0, 120.0),
            Velocity::new(0.0, -16.0, 0.0),
            None,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&ctx, DT, &mut rng);
        assert!(
            update.velocity.z <= -ATTACK_RUN_CLIMB_LIMIT,
            "well above 50m the dive should saturate the climb clamp"
        );
    }

    #[test]
    fn test_recon_transits_then_orbits() {
        let limits = MotionLimits::default();
        let orbit_point = Position::new(0.0, 0.0, 100.0);

        // Far out: direct transit toward the point.
        let mut far = make_context(
            &limits,
            HostileBehavior::Recon,
            Position::new(0.0, 500.0, 100.0),
            Velocity::new(0.0, -10.0, 0.0),
            None,
        );
        far.target_point = Some(orbit_point);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let update = evaluate(&far, DT, &mut rng);
        assert!(update.velocity.y < 0.0);
        let expected_speed = limits.cruise_speed * RECON_TRANSIT_SPEED_FACTOR;
        assert!((update.velocity.horizontal_speed() - expected_speed).abs() < 1e-6);

        // On the orbit ring: velocity should be roughly tangential.
        let mut near = make_context(
            &limits,
            HostileBehavior::Recon,
            Position::new(RECON_ORBIT_RADIUS, 0.0, 100.0),
            Velocity::new(0.0, 10.0, 0.0),
            None,
        );
        near.target_point = Some(orbit_point);
        let update = evaluate(&near, DT, &mut rng);
        // Radial component (along +x here) should be near zero on the ring.
        assert!(update.velocity.x.abs() < 1.0);
        assert!(update.velocity.horizontal_speed() > 1.0);
    }
}
