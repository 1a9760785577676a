/// Sentinel reported when the solver's diagnostics never name a root.
pub const ROOT_NOT_AVAILABLE: &str = "n/a";

const ROOT_MARKER: &str = "root:";

/// Extracts tree edges from solver standard output: the first two
/// whitespace-separated tokens of each line. Lines with fewer than two
/// tokens are the solver's own diagnostics and are skipped, never fatal.
pub fn parse_tree_edges(lines: &[String]) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for line in lines {
        let mut tokens = line.split_whitespace();
        if let (Some(u), Some(v)) = (tokens.next(), tokens.next()) {
            edges.push((u.to_string(), v.to_string()));
        }
    }
    edges
}

/// Extracts the chosen root from solver standard error: the text after the
/// `root:` marker on the first line containing it, trimmed. Absent marker
/// reports the not-available sentinel, not an error.
pub fn parse_root(lines: &[String]) -> String {
    lines
        .iter()
        .find(|line| line.contains(ROOT_MARKER))
        .and_then(|line| line.split(ROOT_MARKER).last())
        .map(|tail| tail.trim().to_string())
        .unwrap_or_else(|| ROOT_NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn edges_take_first_two_tokens() {
        let out = lines(&["A B 0.5 extra", "B C"]);
        assert_eq!(
            parse_tree_edges(&out),
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
    }

    #[test]
    fn short_lines_are_skipped_not_fatal() {
        let out = lines(&["A B", "converged", "", "C D"]);
        let edges = parse_tree_edges(&out);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn root_taken_from_first_marker_line() {
        let err = lines(&["iteration 10", "picked root: CHD8 ", "root: IGNORED"]);
        assert_eq!(parse_root(&err), "CHD8");
    }

    #[test]
    fn missing_marker_reports_sentinel() {
        let err = lines(&["no diagnostics here"]);
        assert_eq!(parse_root(&err), ROOT_NOT_AVAILABLE);
    }
}
