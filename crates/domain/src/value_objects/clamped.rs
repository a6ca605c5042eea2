/// Outcome of forcing a raw number into a value object's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped<T> {
    pub value: T,
    pub requested: i64,
    pub was_clamped: bool,
}

impl<T> Clamped<T> {
    pub(crate) fn new(value: T, requested: i64, was_clamped: bool) -> Self {
        Self {
            value,
            requested,
            was_clamped,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Clamp `raw` into `min..=max`, returning the bounded number and whether it moved.
pub(crate) fn clamp_i64(raw: i64, min: i64, max: i64) -> (i64, bool) {
    let bounded = raw.clamp(min, max);
    (bounded, bounded != raw)
}
