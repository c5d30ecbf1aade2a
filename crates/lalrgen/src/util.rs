use crate::BuildError;
use std::{cmp, fmt};

pub fn display_fn(f: impl Fn(&mut fmt::Formatter<'_>) -> fmt::Result) -> impl fmt::Display {
    DisplayFn(f)
}

struct DisplayFn<F>(F);
impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(formatter)
    }
}

/// Borrow two distinct elements of a slice mutably at once.
pub fn get_two_mut<T>(slice: &mut [T], x: usize, y: usize) -> (&mut T, &mut T) {
    assert!(
        x != y && cmp::max(x, y) < slice.len(),
        "index condition not satisfied"
    );
    let i = (x + y) / 2 + 1;
    let (a, b) = slice.split_at_mut(i);
    if x < y {
        (&mut a[x], &mut b[y - i])
    } else {
        (&mut b[x - i], &mut a[y])
    }
}

/// Run `pass` until it reports no change, and return the number of passes
/// including the last one.
///
/// Needing more than `bound` passes is an error.
pub fn fixed_point<F>(what: &'static str, bound: usize, mut pass: F) -> Result<usize, BuildError>
where
    F: FnMut() -> bool,
{
    let mut passes = 0;
    loop {
        passes += 1;
        if passes > bound {
            return Err(BuildError::FixedPointBound { what, bound });
        }
        if !pass() {
            return Ok(passes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_two_mut() {
        let mut v = vec!["a", "b", "c", "d"];
        assert!(matches!(get_two_mut(&mut v, 0, 1), t if *t.0=="a" && *t.1=="b"));
        assert!(matches!(get_two_mut(&mut v, 1, 0), t if *t.0=="b" && *t.1=="a"));
        assert!(matches!(get_two_mut(&mut v, 0, 2), t if *t.0=="a" && *t.1=="c"));
        assert!(matches!(get_two_mut(&mut v, 2, 1), t if *t.0=="c" && *t.1=="b"));
        assert!(matches!(get_two_mut(&mut v, 3, 2), t if *t.0=="d" && *t.1=="c"));
    }

    #[test]
    fn fixed_point_counts_passes() {
        let mut n = 0;
        let passes = fixed_point("countdown", 10, || {
            n += 1;
            n < 4
        })
        .unwrap();
        assert_eq!(passes, 4);

        // the last pass that changes nothing is counted too.
        assert_eq!(fixed_point("noop", 1, || false).unwrap(), 1);
    }

    #[test]
    fn fixed_point_rejects_divergence() {
        let err = fixed_point("diverging", 5, || true).unwrap_err();
        assert!(matches!(
            err,
            BuildError::FixedPointBound {
                what: "diverging",
                bound: 5
            }
        ));
    }
}
