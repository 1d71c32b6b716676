use std::collections::HashSet;

/// Lines this long or longer are prose, not equations.
pub const MAX_EQUATION_CHARS: usize = 200;

/// Candidate equation lines: any line with an `=` that is shorter than
/// [`MAX_EQUATION_CHARS`], trimmed, de-duplicated in first-seen order.
///
/// Purely textual. Inequalities and assignments in prose slip through, and
/// equations broken over several lines are missed.
pub fn extract_equations(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .filter(|line| line.contains('=') && line.chars().count() < MAX_EQUATION_CHARS)
        .map(str::trim)
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}
