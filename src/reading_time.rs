use crate::post::ContentBlock;

/// Reading speed used for the estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Counts whitespace-delimited words in every heading and body.
///
/// Bodies are counted from their plain-text rendering so that markup never
/// contributes words.
pub fn word_count(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .map(|block| {
            let heading = block.heading.split_whitespace().count();
            let body = block.body.as_text().split_whitespace().count();
            heading + body
        })
        .sum()
}

/// Estimated minutes to read the blocks, rounded up.
///
/// Never less than one minute, so a post without content still reads "1 min".
pub fn reading_time_minutes(blocks: &[ContentBlock]) -> usize {
    word_count(blocks).div_ceil(WORDS_PER_MINUTE).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::testing::{paragraph, words};
    use crate::richtext::StructuredText;

    fn block(heading: &str, body: &str) -> ContentBlock {
        ContentBlock {
            heading: heading.to_string(),
            body: paragraph(body),
        }
    }

    #[test]
    fn test_empty_content_has_no_words() {
        assert_eq!(word_count(&[]), 0);
        assert_eq!(reading_time_minutes(&[]), 1);
    }

    #[test]
    fn test_exactly_two_hundred_words_is_one_minute() {
        let blocks = vec![block("Intro", &words(199))];
        assert_eq!(word_count(&blocks), 200);
        assert_eq!(reading_time_minutes(&blocks), 1);
    }

    #[test]
    fn test_two_hundred_and_one_words_rounds_up() {
        let blocks = vec![block("Intro", &words(150)), block("Fim", &words(49))];
        assert_eq!(word_count(&blocks), 201);
        assert_eq!(reading_time_minutes(&blocks), 2);
    }

    #[test]
    fn test_matches_ceiling_formula() {
        for n in [1, 199, 200, 399, 400, 401, 1000] {
            let blocks = vec![block("", &words(n))];
            assert_eq!(reading_time_minutes(&blocks), n.div_ceil(200).max(1));
        }
    }

    #[test]
    fn test_irregular_whitespace() {
        let blocks = vec![block("  Um   título ", "a\tb\n\nc   d ")];
        assert_eq!(word_count(&blocks), 6);
    }

    #[test]
    fn test_markup_is_not_counted() {
        let body: StructuredText = serde_json::from_str(
            r#"[{"type": "paragraph", "text": "três palavras aqui", "spans": [
                {"start": 0, "end": 4, "type": "hyperlink", "data": {"url": "https://example.com/a b c"}}
            ]}]"#,
        )
        .unwrap();
        let blocks = vec![ContentBlock {
            heading: String::new(),
            body,
        }];
        assert_eq!(word_count(&blocks), 3);
    }

    #[test]
    fn test_empty_heading_and_body() {
        let blocks = vec![ContentBlock {
            heading: String::new(),
            body: StructuredText::default(),
        }];
        assert_eq!(word_count(&blocks), 0);
        assert_eq!(reading_time_minutes(&blocks), 1);
    }
}
