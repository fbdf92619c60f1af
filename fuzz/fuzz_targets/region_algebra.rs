#![no_main]

use arbitrary::Unstructured;
use bezregion::{FillRule, Region};
use libfuzzer_sys::fuzz_target;

fn region(u: &mut Unstructured<'_>) -> arbitrary::Result<Region> {
    let count = u.int_in_range(1..=3)?;
    let mut contours = Vec::with_capacity(count);
    for _ in 0..count {
        contours.push(bezregion::arbitrary::contour(u)?);
    }
    let fill_rule = if u.arbitrary()? {
        FillRule::NonZero
    } else {
        FillRule::EvenOdd
    };
    Region::from_contours(&contours, fill_rule).map_err(|_| arbitrary::Error::IncorrectFormat)
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let (Ok(a), Ok(b)) = (region(&mut u), region(&mut u)) else {
        return;
    };

    let union = a.union(&b);
    let intersection = a.intersection(&b);
    let scale = 1.0 + a.area() + b.area();
    assert!(union.area() + intersection.area() - (a.area() + b.area()) <= 1e-6 * scale);
    assert!(intersection.area() <= a.area().min(b.area()) + 1e-6 * scale);
    assert!(a.subtracting(&b).area() <= a.area() + 1e-6 * scale);
    let _ = a.symmetric_difference(&b);
});
