use crate::error::PipelineError;

/// Split raw multi-line text into IP identifiers, one per non-blank line.
///
/// - surrounding whitespace is trimmed from each line
/// - blank lines are dropped
/// - duplicates are kept and order of appearance is preserved
///
/// Tokens are not validated as addresses; the API decides what it accepts.
pub fn parse_ip_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`parse_ip_lines`], but an input with no identifiers is a validation error.
pub fn normalize(raw: &str) -> Result<Vec<String>, PipelineError> {
    let ips = parse_ip_lines(raw);
    if ips.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(ips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_skips_blank_lines() {
        let ips = parse_ip_lines("  8.8.8.8 \n\n\t1.1.1.1\r\n   \n");
        assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn keeps_duplicates_in_order() {
        let ips = parse_ip_lines("1.2.3.4\n8.8.8.8\n1.2.3.4");
        assert_eq!(ips, vec!["1.2.3.4", "8.8.8.8", "1.2.3.4"]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(normalize(""), Err(PipelineError::EmptyInput)));
        assert!(matches!(normalize(" \n\t\n"), Err(PipelineError::EmptyInput)));
    }
}
