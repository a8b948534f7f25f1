/// Split section text into short paragraphs for the reader view.
///
/// Whitespace is collapsed, the text is cut into sentences after `.`, `!` or
/// `?`, and every `max_sentences` sentences form one paragraph. Text with no
/// more than `max_sentences` sentences comes back as a single paragraph.
#[must_use]
pub fn chunk_into_paragraphs(text: &str, max_sentences: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut sentences: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in words {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    let per_paragraph = max_sentences.max(1);
    if sentences.len() <= per_paragraph {
        return vec![sentences.join(" ")];
    }

    sentences
        .chunks(per_paragraph)
        .map(|chunk| chunk.join(" "))
        .collect()
}
