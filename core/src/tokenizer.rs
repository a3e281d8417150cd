use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref ENGLISH_STOPWORDS: Vec<&'static str> = vec![
        "a","about","above","after","again","against","all","am","an","and","any","are","arent","as","at",
        "be","because","been","before","being","below","between","both","but","by",
        "can","cant","cannot","could","couldnt",
        "did","didnt","do","does","doesnt","doing","dont","down","during",
        "each","few","for","from","further",
        "had","hadnt","has","hasnt","have","havent","having","he","hes","her","here","heres","hers","herself","him","himself","his","how","hows",
        "i","im","ive","if","in","into","is","isnt","it","its","itself",
        "lets","me","more","most","mustnt","my","myself",
        "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
        "same","she","shes","should","shouldnt","so","some","such",
        "than","that","thats","the","their","theirs","them","themselves","then","there","theres","these","they","theyd","theyll","theyre","theyve","this","those","through","to","too",
        "under","until","up","very",
        "was","wasnt","we","were","werent","weve","what","whats","when","whens","where","wheres","which","while","who","whos","whom","why","whys","with","wont","would","wouldnt",
        "you","youd","youll","youre","youve","your","yours","yourself","yourselves"
    ];
}

/// Turns raw text into stemmed, stopword-filtered terms.
///
/// Stopwords are compared against the lower-cased, punctuation-stripped token
/// before stemming, so entries like "don't" must be listed as "dont".
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
}

impl Tokenizer {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { stopwords: stopwords.into_iter().map(Into::into).collect() }
    }

    /// Tokenizer with a built-in English stopword list.
    pub fn english() -> Self {
        Self::new(ENGLISH_STOPWORDS.iter().copied())
    }

    fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// Tokenize text using NFKC normalization, punctuation stripping, lowercase,
    /// stopword removal, and stemming. Repeated terms are preserved in input order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>();
        let stripped = PUNCT.replace_all(&normalized, "").to_lowercase();
        stripped
            .split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .map(|token| STEMMER.stem(token).into_owned())
            .collect()
    }

    /// Normalize a single term, failing unless it yields exactly one token.
    pub fn normalize_term(&self, term: &str) -> Result<String> {
        let mut tokens = self.tokenize(term);
        if tokens.len() != 1 {
            return Err(Error::InvalidQueryTerm { term: term.to_string(), tokens: tokens.len() });
        }
        Ok(tokens.remove(0))
    }
}
