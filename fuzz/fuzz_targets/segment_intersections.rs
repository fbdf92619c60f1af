#![no_main]

use arbitrary::Unstructured;
use bezregion::{
    intersect::{intersect, overlap_params, SegmentIntersection},
    num::points_coincide,
};
use kurbo::ParamCurve;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let (Ok(a), Ok(b)) = (
        bezregion::arbitrary::segment(&mut u),
        bezregion::arbitrary::segment(&mut u),
    ) else {
        return;
    };

    match intersect(&a, &b) {
        SegmentIntersection::NoIntersection => {}
        SegmentIntersection::FiniteSet(params) => {
            for w in params.windows(2) {
                assert!(w[0].0 <= w[1].0);
            }
            for (s, t) in params {
                assert!((0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t));
                assert!(points_coincide(a.eval(s), b.eval(t)));
            }
        }
        SegmentIntersection::Overlapping => {
            // Overlapping segments share at least the two ends of the shared part.
            assert!(overlap_params(&a, &b).len() >= 2);
        }
    }
});
