//! Message classification: is this a weather question, and about which city?

use crate::catalog::CityCatalog;

/// Vocabulary that marks a message as a weather question.
pub const WEATHER_KEYWORDS: [&str; 8] = [
    "weather",
    "temperature",
    "forecast",
    "rain",
    "sun",
    "humidity",
    "snow",
    "wind",
];

/// True if the lower-cased message contains any weather keyword.
///
/// This is a plain substring test, so "sunday" counts as "sun".
pub fn is_weather_intent(message: &str) -> bool {
    let message = message.to_lowercase();
    WEATHER_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

/// The first catalog city whose name equals one whitespace-separated word
/// of the message, compared case-insensitively.
///
/// Multi-word city names and words with punctuation attached never match.
pub fn extract_city<'c>(message: &str, catalog: &'c CityCatalog) -> Option<&'c str> {
    let message = message.to_lowercase();
    let city = catalog.find_in_tokens(message.split_whitespace());
    tracing::debug!("Extracted city: {:?}", city);
    city
}
