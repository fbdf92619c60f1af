#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(p) = bezregion::arbitrary::poly(1e4, &mut u) else {
        return;
    };
    let Ok(range) = bezregion::arbitrary::float_in_range(0.5, 4.0, &mut u) else {
        return;
    };

    // How much relative accuracy do we expect?
    let accuracy = 1e-11;
    let size: f64 = p
        .coeffs()
        .iter()
        .enumerate()
        .map(|(i, c)| c.abs() * range.powi(i as i32))
        .sum();
    let threshold = accuracy * size;
    let roots = p.roots_between(-range, range, threshold);

    if p.eval(-range).signum() != p.eval(range).signum() {
        assert!(!roots.is_empty());
    }
    for w in roots.windows(2) {
        assert!(w[0] <= w[1]);
    }
    for r in roots {
        assert!((-range..=range).contains(&r));
        assert!(p.eval(r).abs() <= threshold);
    }
});
