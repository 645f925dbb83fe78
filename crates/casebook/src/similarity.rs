use std::collections::HashSet;

/// Common English stop words to filter out
const STOP_WORDS: &[&str] = &[
  // Articles and determiners
  "the", "a", "an", // Conjunctions
  "and", "or", "but", // Prepositions
  "in", "on", "at", "to", "for", "of", "with", "by", "over", // Common verbs
  "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
  "would", "could", "should", // Pronouns
  "you", "your", "we", "our", "us", "they", "them", "their", "it", "its",
];

/// Get the stop words as a HashSet for efficient lookup
pub fn get_stop_words() -> HashSet<&'static str> {
  STOP_WORDS.iter().cloned().collect()
}

/// Split text into lowercase terms, keeping repeats and dropping stop words
pub fn tokenize(text: &str) -> Vec<String> {
  let stop_words = get_stop_words();

  text
    .split_whitespace()
    .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
    .filter(|word| !word.is_empty() && !stop_words.contains(word.as_str()))
    .collect()
}

/// Calculate cosine similarity between two embeddings
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    0.0
  } else {
    dot_product / (magnitude_a * magnitude_b)
  }
}

/// Cosine distance as vector backends report it, in [0, 2]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
  1.0 - cosine(a, b)
}

/// Convert a cosine distance to a similarity score in [0, 1]
pub fn distance_to_similarity(distance: f32) -> f32 {
  if distance.is_nan() {
    return 0.0;
  }
  // distance is in [0, 2]; identical = 1.0, orthogonal = 0.5, opposite = 0.0
  (2.0 - distance.clamp(0.0, 2.0)) / 2.0
}

/// Scale a vector to unit length, leaving the zero vector untouched
pub fn normalize(vector: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
  if magnitude > 0.0 {
    vector.into_iter().map(|x| x / magnitude).collect()
  } else {
    vector
  }
}
