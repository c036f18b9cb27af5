/// Splits a requirements text into note blocks (`#`-separated) of bullet
/// items (`,`-separated). Leading `#`s are ignored; blank items and blocks
/// are dropped.
pub fn note_blocks(requirements: &str) -> Vec<Vec<String>> {
    requirements
        .trim_start_matches('#')
        .split('#')
        .map(|block| {
            block
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_and_items() {
        let blocks = note_blocks("##DSA, OS , DBMS#Resume shortlisting,Two rounds");
        assert_eq!(
            blocks,
            vec![
                vec!["DSA".to_string(), "OS".to_string(), "DBMS".to_string()],
                vec!["Resume shortlisting".to_string(), "Two rounds".to_string()],
            ]
        );
    }

    #[test]
    fn test_blank_pieces_are_dropped() {
        assert!(note_blocks("").is_empty());
        assert!(note_blocks("#  # ,").is_empty());
        assert_eq!(note_blocks("a,,b##c").len(), 2);
    }
}
