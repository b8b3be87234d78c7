//! Recursive chunk splitter.
//!
//! Divides extracted document text into overlapping segments of a target
//! size, cutting at the largest boundary available inside each window:
//! paragraph break first, then sentence end, then any whitespace, then a hard
//! character cut. Chunk text is the exact slice of the input, so the
//! non-overlapping cores concatenate back to the original text.

use serde::{Deserialize, Serialize};

/// A contiguous slice of document text. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The text content, untrimmed.
    pub text: String,
    /// Originating document identifier (file name or similar).
    pub source: String,
    /// 1-based page number, when the source format has pages.
    pub page: Option<usize>,
    /// Char offset of this chunk within its segment.
    pub start_offset: usize,
    /// Position of this chunk within its segment.
    pub chunk_index: usize,
}

pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// `chunk_overlap` must be smaller than `chunk_size`; the config layer
    /// validates this before construction.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Empty or whitespace-only input yields zero chunks; the caller decides
    /// whether that is worth reporting. Non-blank input always yields at
    /// least one chunk.
    pub fn split(&self, text: &str, source: &str, page: Option<usize>) -> Vec<DocumentChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chunk_index = 0;

        while start < total {
            let window_end = (start + self.chunk_size).min(total);
            let end = if window_end == total {
                total
            } else {
                self.cut_point(&chars, start, window_end)
            };

            chunks.push(DocumentChunk {
                text: chars[start..end].iter().collect(),
                source: source.to_string(),
                page,
                start_offset: start,
                chunk_index,
            });
            chunk_index += 1;

            if end == total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the cut position for a window that does not reach the end of the
    /// text. Boundaries below `floor` are rejected so the next window always
    /// advances past the current start.
    fn cut_point(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let floor = start + self.chunk_overlap + 1;

        // Paragraph break: cut right after the blank line.
        let mut pos = window_end;
        while pos >= floor.max(2) {
            if chars[pos - 1] == '\n' && chars[pos - 2] == '\n' {
                return pos;
            }
            pos -= 1;
        }

        // Sentence end: terminal punctuation followed by whitespace.
        let mut pos = window_end;
        while pos >= floor.max(2) {
            if chars[pos - 1].is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?') {
                return pos;
            }
            pos -= 1;
        }

        // Any whitespace.
        let mut pos = window_end;
        while pos >= floor {
            if chars[pos - 1].is_whitespace() {
                return pos;
            }
            pos -= 1;
        }

        window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(size, overlap)
    }

    /// Rebuild the input from each chunk's non-overlapping core plus the
    /// final chunk.
    fn reconstruct(chunks: &[DocumentChunk]) -> String {
        let mut out = String::new();
        for pair in chunks.windows(2) {
            let core_len = pair[1].start_offset - pair[0].start_offset;
            out.extend(pair[0].text.chars().take(core_len));
        }
        if let Some(last) = chunks.last() {
            out.push_str(&last.text);
        }
        out
    }

    #[test]
    fn blank_input_yields_zero_chunks() {
        let s = splitter(100, 20);
        assert!(s.split("", "doc", None).is_empty());
        assert!(s.split("   \n\t  ", "doc", None).is_empty());
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let s = splitter(100, 20);
        let chunks = s.split("A short note.", "doc", None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A short note.");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn neighbors_overlap_by_the_configured_amount() {
        let s = splitter(50, 10);
        let text = "word ".repeat(40);
        let chunks = s.split(&text, "doc", None);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let step = pair[1].start_offset - pair[0].start_offset;
            assert_eq!(pair[0].text.chars().count() - step, 10);
            assert!(step >= 1);
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let s = splitter(80, 16);
        let text = "First paragraph with several sentences. Another one here.\n\n\
                    Second paragraph, which is noticeably longer and keeps going for a while \
                    so that multiple windows are needed. It also has punctuation! And more.\n\n\
                    Third paragraph to finish.";
        let chunks = s.split(text, "doc", None);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn round_trip_survives_text_without_any_boundaries() {
        let s = splitter(32, 8);
        let text = "x".repeat(200);
        let chunks = s.split(&text, "doc", None);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn round_trip_is_char_safe_for_multibyte_text() {
        let s = splitter(20, 4);
        let text = "日本語のテキストです。とても長い文章を分割します。まだまだ続きます。最後の文。";
        let chunks = s.split(text, "doc", None);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn paragraph_breaks_win_over_mid_sentence_cuts() {
        let s = splitter(60, 10);
        let text = format!("{}\n\n{}", "alpha beta gamma delta.", "w".repeat(100));
        let chunks = s.split(&text, "doc", None);
        // First cut lands right after the blank line, not mid-paragraph.
        assert!(chunks[0].text.ends_with("\n\n"));
    }

    #[test]
    fn sentence_ends_are_preferred_over_word_cuts() {
        let s = splitter(40, 8);
        let text = "One sentence here. Then a stretch of words without terminal punctuation going on";
        let chunks = s.split(text, "doc", None);
        assert!(chunks[0].text.ends_with(". "));
    }

    #[test]
    fn chunk_metadata_carries_source_and_page() {
        let s = splitter(100, 20);
        let chunks = s.split("Page body text.", "report.txt", Some(3));
        assert_eq!(chunks[0].source, "report.txt");
        assert_eq!(chunks[0].page, Some(3));
        assert_eq!(chunks[0].chunk_index, 0);
    }
}
