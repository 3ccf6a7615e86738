//! Sentence splitting and length-bounded segmentation.

const SENTENCE_END: [char; 6] = ['.', '!', '?', '。', '！', '？'];
const CLOSERS: [char; 5] = ['"', '\'', ')', ']', '”'];

/// Split text into sentences, keeping the terminating punctuation (and any
/// closing quote or bracket right after it) with each sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if !SENTENCE_END.contains(&c) {
            continue;
        }

        // CJK terminators don't need trailing whitespace.
        let is_end = match chars.peek() {
            None => true,
            Some(&nc) => nc.is_whitespace() || CLOSERS.contains(&nc) || c > '\u{2fff}',
        };
        if !is_end {
            continue;
        }

        while let Some(&nc) = chars.peek() {
            if !CLOSERS.contains(&nc) {
                break;
            }
            current.push(nc);
            chars.next();
        }

        push_trimmed(&mut sentences, &current);
        current.clear();
    }

    push_trimmed(&mut sentences, &current);
    sentences
}

/// Break text into segments of at most `max_chars` characters.
///
/// Sentences are packed greedily; a sentence longer than the limit is split
/// at word boundaries, and a single word longer than the limit is split at
/// character boundaries. Blank text yields no segments.
pub fn segment_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        let pieces = if char_len(&sentence) > max_chars {
            split_long_sentence(&sentence, max_chars)
        } else {
            vec![sentence]
        };

        for piece in pieces {
            let joined_len = if current.is_empty() {
                char_len(&piece)
            } else {
                char_len(&current) + 1 + char_len(&piece)
            };

            if joined_len <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            } else {
                segments.push(std::mem::take(&mut current));
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        for part in split_long_word(word, max_chars) {
            let needed = if current.is_empty() {
                char_len(&part)
            } else {
                char_len(&current) + 1 + char_len(&part)
            };
            if needed > max_chars && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&part);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn split_long_word(word: &str, max_chars: usize) -> Vec<String> {
    if char_len(word) <= max_chars {
        return vec![word.to_string()];
    }
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
