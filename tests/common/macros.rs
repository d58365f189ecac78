/// Asserts that every particle position and velocity is finite.
#[macro_export]
macro_rules! assert_finite_state {
    ($flock:expr) => {
        for id in 0..$flock.len() {
            let p = $flock.position(id);
            let v = $flock.velocity(id);
            assert!(
                p.is_finite() && v.is_finite(),
                "Particle {} has non-finite state: p={:?} v={:?}",
                id,
                p,
                v
            );
        }
    };
}

/// Asserts that every particle lies within `[-bound, bound]` on each axis.
#[macro_export]
macro_rules! assert_within_bounds {
    ($flock:expr, $bound:expr) => {
        for id in 0..$flock.len() {
            let p = $flock.position(id);
            assert!(
                p.abs().max_element() <= $bound,
                "Particle {} at {:?} is outside +/-{} at tick {}",
                id,
                p,
                $bound,
                $flock.tick()
            );
        }
    };
}

/// Asserts two vectors agree component-wise within `eps`.
#[macro_export]
macro_rules! assert_vec_near {
    ($actual:expr, $expected:expr, $eps:expr) => {
        let actual = $actual;
        let expected = $expected;
        assert!(
            (actual - expected).abs().max_element() <= $eps,
            "{:?} is not within {} of {:?}",
            actual,
            $eps,
            expected
        );
    };
}
