
use fancy_regex::Regex;
use std::sync::LazyLock;

/// Words dropped from normalized descriptions
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "is", "it", "of", "to", "in", "on", "for", "by", "with", "as", "that",
    "was", "at", "this", "which", "or", "from", "be", "are", "not", "have", "but", "all", "we",
    "our", "your", "you", "they", "their", "had", "has", "will", "can", "do", "does", "did",
    "just", "if", "how", "so", "about",
];

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").expect("valid regex"));
static NON_LETTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z]").expect("valid regex"));
static SINGLE_LETTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?<=\s)[a-zA-Z](?=\s)").expect("valid regex"));
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// The standard English stop-word list (NLTK `stopwords.words("english")`)
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Whether `word` is in the custom list or the English list
#[inline]
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word) || ENGLISH_STOP_WORDS.contains(&word)
}

/// Lowercase `text` and keep only alphabetic tokens that are not stop words
#[inline]
pub fn strip_stopwords(text: &str) -> String {
    let lowered = text.to_lowercase();
    TOKEN_REGEX
        .find_iter(&lowered)
        .filter_map(Result::ok)
        .map(|m| m.as_str())
        .filter(|token| token.chars().all(char::is_alphabetic) && !is_stop_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a title to lowercase ASCII words for loose matching
#[inline]
pub fn simplify_title(title: &str) -> String {
    let letters = NON_LETTER_REGEX.replace_all(title, " ");
    let padded = format!(" {} ", letters);
    let without_singles = SINGLE_LETTER_REGEX.replace_all(&padded, " ");
    WHITESPACE_REGEX
        .replace_all(&without_singles, " ")
        .trim()
        .to_lowercase()
}
