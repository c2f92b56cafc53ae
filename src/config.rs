//! Analysis configuration.

/// Tuning knobs of the analysis.
///
/// # Examples
///
/// ```
/// use exceptional::config::AnalysisConfig;
///
/// let config = AnalysisConfig {
///     narrowing_iterations: 0,
///     ..Default::default()
/// };
/// assert_eq!(config.widening_threshold, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Number of updates a loop head absorbs by plain join before widening kicks in.
    pub widening_threshold: usize,
    /// Number of descending rounds after the ascending phase stabilises.
    pub narrowing_iterations: usize,
    /// Cap on block visits. `None` scales with the procedure size.
    pub max_iterations: Option<usize>,
    /// Track array lengths as intervals. When disabled, every length is `[0, +∞]`.
    pub track_array_length: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            widening_threshold: 1,
            narrowing_iterations: 2,
            max_iterations: None,
            track_array_length: true,
        }
    }
}

impl AnalysisConfig {
    /// Iteration cap for a procedure with the given number of blocks and statements.
    pub fn iteration_cap(&self, blocks: usize, statements: usize) -> usize {
        self.max_iterations.unwrap_or(64 * (blocks + statements).max(1))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_iteration_cap() {
        let config = AnalysisConfig::default();
        assert_eq!(config.iteration_cap(3, 7), 640);
        assert_eq!(config.iteration_cap(0, 0), 64);

        let fixed = AnalysisConfig {
            max_iterations: Some(5),
            ..Default::default()
        };
        assert_eq!(fixed.iteration_cap(100, 100), 5);
    }
}
