//! Instruction template for the insight model.

use crate::weather::WeatherRecord;

pub const SYSTEM_PROMPT: &str = "You are a friendly weather assistant. \
Given a current weather observation, write a short summary of the conditions, \
one practical recommendation for someone going outside, a comfort level \
(comfortable, moderate or uncomfortable) and whether they should bring an umbrella. \
Base every statement on the observation only. Answer with JSON matching the provided schema.";

pub fn user_prompt(record: &WeatherRecord) -> String {
    format!(
        "City: {}\n\
         Temperature: {}\n\
         Feels like: {}\n\
         Humidity: {}%\n\
         Conditions: {}\n\
         Wind speed: {}\n\
         Observed at (unix seconds): {}",
        record.city(),
        record.temperature(),
        record.feels_like(),
        record.humidity(),
        record.description(),
        record.wind_speed(),
        record.timestamp(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_carries_every_field() {
        let record = WeatherRecord::builder()
            .city("London")
            .temperature(15.2)
            .feels_like(13.8)
            .humidity(75)
            .description("light rain")
            .wind_speed(5.5)
            .timestamp(1234567890)
            .build()
            .unwrap();
        let prompt = user_prompt(&record);
        for needle in ["London", "15.2", "13.8", "75%", "light rain", "5.5", "1234567890"] {
            assert!(prompt.contains(needle), "missing {}", needle);
        }
    }
}
