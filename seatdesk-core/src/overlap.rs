/// Whether half-open hour intervals `[a_start, a_end)` and `[b_start, b_end)`
/// share at least one hour. Touching intervals do not overlap.
pub fn overlaps(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    a_start < b_end && b_start < a_end
}
