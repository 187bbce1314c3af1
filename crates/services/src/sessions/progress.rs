/// Aggregated view of test progress, useful for front-ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub skipped: usize,
    pub is_complete: bool,
}
