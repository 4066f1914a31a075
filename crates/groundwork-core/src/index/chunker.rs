//! Document chunking for embedding
//!
//! Text is split on blank-line paragraph boundaries and paragraphs are
//! packed into chunks of at most `chunk_size` characters. Each new chunk is
//! seeded with the last `overlap` characters of the one before it. Oversized
//! paragraphs fall back to sentence boundaries, and oversized sentences to a
//! fixed character stride of `chunk_size - overlap`.
//!
//! Lengths are counted in `char`s, so multi-byte text is never cut inside a
//! code point.

use lazy_static::lazy_static;
use regex::Regex;

/// Default upper bound on chunk length, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 512;
/// Default number of trailing characters carried into the next chunk
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const PARAGRAPH_JOINER: &str = "\n\n";
const SENTENCE_JOINER: &str = " ";
const OVERLAP_JOINER: &str = "\n";

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// Split `text` into ordered, overlapping chunks.
///
/// Returns an empty vector for empty or whitespace-only input. `overlap` is
/// clamped below `chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let mut builder = ChunkBuilder::new(chunk_size, overlap);

    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) <= chunk_size {
            builder.push(paragraph, PARAGRAPH_JOINER);
            continue;
        }

        for (i, sentence) in split_sentences(paragraph).into_iter().enumerate() {
            let joiner = if i == 0 {
                PARAGRAPH_JOINER
            } else {
                SENTENCE_JOINER
            };
            if char_len(sentence) <= chunk_size {
                builder.push(sentence, joiner);
            } else {
                builder.push_windows(stride_windows(sentence, chunk_size, overlap));
            }
        }
    }

    builder.finish()
}

/// Accumulates pieces (each already within budget) into chunks
struct ChunkBuilder {
    chunk_size: usize,
    overlap: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
}

impl ChunkBuilder {
    fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn push(&mut self, piece: &str, joiner: &str) {
        let piece_len = char_len(piece);

        if self.current.is_empty() {
            self.start(piece.to_string(), piece_len);
            return;
        }

        if self.current_len + char_len(joiner) + piece_len <= self.chunk_size {
            self.current.push_str(joiner);
            self.current.push_str(piece);
            self.current_len += char_len(joiner) + piece_len;
            return;
        }

        let closed = std::mem::take(&mut self.current);
        let seed = overlap_tail(&closed, self.overlap);
        let seed_len = char_len(seed);

        if !seed.is_empty() && seed_len + OVERLAP_JOINER.len() + piece_len <= self.chunk_size {
            let seeded = format!("{}{}{}", seed, OVERLAP_JOINER, piece);
            self.start(seeded, seed_len + OVERLAP_JOINER.len() + piece_len);
        } else {
            self.start(piece.to_string(), piece_len);
        }
        self.chunks.push(closed);
    }

    /// Stride windows already overlap each other, so they bypass seeding.
    /// The last window stays open for following pieces.
    fn push_windows(&mut self, windows: Vec<&str>) {
        self.flush();
        let count = windows.len();
        for (i, window) in windows.into_iter().enumerate() {
            if i + 1 == count {
                self.start(window.to_string(), char_len(window));
            } else {
                self.chunks.push(window.to_string());
            }
        }
    }

    fn start(&mut self, text: String, len: usize) {
        self.current = text;
        self.current_len = len;
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
            self.current_len = 0;
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split a paragraph after `.`, `!` or `?` followed by whitespace
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = paragraph[start..next_idx].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = i + c.len_utf8();
            }
        }
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Fixed-size character windows advancing by `chunk_size - overlap`
fn stride_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<&str> {
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;
    let step = (chunk_size - overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(total);
        let window = &text[offsets[start]..offsets[end]];
        if !window.trim().is_empty() {
            windows.push(window);
        }
        if end == total {
            break;
        }
        start += step;
    }
    windows
}

/// Trailing `overlap` characters of a closed chunk, moved forward to the
/// next word start when the cut lands mid-word
fn overlap_tail(chunk: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }

    let start = chunk
        .char_indices()
        .rev()
        .nth(overlap - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let tail = &chunk[start..];

    let mid_word = chunk[..start]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace());
    let tail = if mid_word {
        match tail.find(char::is_whitespace) {
            Some(ws) => &tail[ws..],
            None => tail,
        }
    } else {
        tail
    };

    tail.trim()
}
