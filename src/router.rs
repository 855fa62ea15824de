//! Chat message routing
//!
//! Each message takes exactly one path: a weather lookup for a recognized
//! city, a fixed hint when the city is missing, or a short chat completion.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::CityCatalog;
use crate::chat::ChatGateway;
use crate::classifier::{extract_city, is_weather_intent};
use crate::weather::WeatherGateway;

/// Reply for weather questions that name no known city.
pub const MISSING_CITY_REPLY: &str = "Please specify a valid city to get the weather information.";

/// Reply when the chat provider returns no text.
pub const NO_RESPONSE_REPLY: &str = "No response";

/// Wrap a user message in the length-limiting instruction sent to the chat provider.
pub fn chat_prompt(message: &str) -> String {
    format!("Please respond in no more than 15 words: {message}")
}

/// Where a message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'c> {
    /// Weather question about a catalog city
    Weather(&'c str),
    /// Weather question without a recognizable city
    MissingCity,
    /// Anything else
    Chat,
}

impl<'c> Route<'c> {
    pub fn classify(message: &str, catalog: &'c CityCatalog) -> Self {
        if !is_weather_intent(message) {
            return Route::Chat;
        }

        match extract_city(message, catalog) {
            Some(city) => Route::Weather(city),
            None => Route::MissingCity,
        }
    }
}

/// Dispatches chat messages to the weather or chat gateway.
#[derive(Clone)]
pub struct ChatRouter {
    weather: Arc<dyn WeatherGateway>,
    chat: Arc<dyn ChatGateway>,
}

impl ChatRouter {
    pub fn new(weather: Arc<dyn WeatherGateway>, chat: Arc<dyn ChatGateway>) -> Self {
        Self { weather, chat }
    }

    /// Produce the bot reply for `message`. Gateway failures are returned
    /// as-is; nothing is retried or cached.
    #[instrument(skip_all)]
    pub async fn respond(&self, message: &str, catalog: &CityCatalog) -> crate::Result<String> {
        let route = Route::classify(message, catalog);
        debug!(?route, "Routing chat message");

        match route {
            Route::Weather(city) => self.weather.fetch(city).await,
            Route::MissingCity => Ok(MISSING_CITY_REPLY.to_string()),
            Route::Chat => Ok(self
                .chat
                .complete(&chat_prompt(message))
                .await?
                .unwrap_or_else(|| NO_RESPONSE_REPLY.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SkydashError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWeather {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl WeatherGateway for FakeWeather {
        async fn fetch(&self, city: &str) -> crate::Result<String> {
            self.calls.lock().unwrap().push(city.to_string());
            if self.fail {
                return Err(SkydashError::provider("OpenWeather", "city not found"));
            }
            Ok(format!("The weather in {city}: clear sky, Temperature: 20°C, Humidity: 40%"))
        }
    }

    #[derive(Default)]
    struct FakeChat {
        prompts: Mutex<Vec<String>>,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl ChatGateway for FakeChat {
        async fn complete(&self, prompt: &str) -> crate::Result<Option<String>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.map(str::to_string))
        }
    }

    fn catalog() -> CityCatalog {
        CityCatalog::new(vec!["Paris".to_string(), "Lagos".to_string()])
    }

    fn router(weather: &Arc<FakeWeather>, chat: &Arc<FakeChat>) -> ChatRouter {
        ChatRouter::new(weather.clone(), chat.clone())
    }

    #[test]
    fn test_classify_routes() {
        let catalog = catalog();
        assert_eq!(
            Route::classify("weather in Paris", &catalog),
            Route::Weather("Paris")
        );
        assert_eq!(
            Route::classify("weather in Gotham", &catalog),
            Route::MissingCity
        );
        assert_eq!(Route::classify("I love Paris", &catalog), Route::Chat);
    }

    #[tokio::test]
    async fn test_weather_with_known_city_calls_weather_once() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat::default());

        let reply = router(&weather, &chat)
            .respond("what's the weather in Paris today", &catalog())
            .await
            .unwrap();

        assert_eq!(
            reply,
            "The weather in Paris: clear sky, Temperature: 20°C, Humidity: 40%"
        );
        assert_eq!(*weather.calls.lock().unwrap(), vec!["Paris".to_string()]);
        assert!(chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weather_with_unknown_city_calls_nothing() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat::default());

        let reply = router(&weather, &chat)
            .respond("what's the weather in Gotham", &catalog())
            .await
            .unwrap();

        assert_eq!(reply, MISSING_CITY_REPLY);
        assert!(weather.calls.lock().unwrap().is_empty());
        assert!(chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weather_before_catalog_load_asks_for_city() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat::default());

        let reply = router(&weather, &chat)
            .respond("weather in Paris", &CityCatalog::empty())
            .await
            .unwrap();

        assert_eq!(reply, MISSING_CITY_REPLY);
        assert!(weather.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_messages_go_to_chat_with_wrapped_prompt() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat {
            reply: Some("Why did the chicken cross the road?"),
            ..FakeChat::default()
        });

        let reply = router(&weather, &chat)
            .respond("tell me a joke", &catalog())
            .await
            .unwrap();

        assert_eq!(reply, "Why did the chicken cross the road?");
        assert_eq!(
            *chat.prompts.lock().unwrap(),
            vec!["Please respond in no more than 15 words: tell me a joke".to_string()]
        );
        assert!(weather.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chat_reply_falls_back() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat::default());

        let reply = router(&weather, &chat)
            .respond("hello there", &catalog())
            .await
            .unwrap();

        assert_eq!(reply, NO_RESPONSE_REPLY);
    }

    #[tokio::test]
    async fn test_weather_failure_is_propagated() {
        let weather = Arc::new(FakeWeather {
            fail: true,
            ..FakeWeather::default()
        });
        let chat = Arc::new(FakeChat::default());

        let err = router(&weather, &chat)
            .respond("forecast for lagos", &catalog())
            .await
            .unwrap_err();

        assert!(matches!(err, SkydashError::Provider { .. }));
        assert_eq!(weather.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_requests_are_not_cached() {
        let weather = Arc::new(FakeWeather::default());
        let chat = Arc::new(FakeChat::default());
        let router = router(&weather, &chat);
        let catalog = catalog();

        for _ in 0..3 {
            router.respond("rain in Paris", &catalog).await.unwrap();
        }

        assert_eq!(weather.calls.lock().unwrap().len(), 3);
    }
}
