use chrono::{ DateTime, TimeZone, Timelike };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Fa,
    En,
}

impl Locale {
    /// Reply appended in place of the assistant's answer when a turn fails.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            Locale::Fa => "متأسفانه خطایی رخ داد. لطفاً دوباره تلاش کنید.",
            Locale::En => "Sorry, something went wrong. Please try again.",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            Locale::Fa => "سلام! چطور می‌تونم کمکتون کنم؟",
            Locale::En => "Hi! How can I help you?",
        }
    }

    pub fn start_hint(&self) -> &'static str {
        match self {
            Locale::Fa => "پیام خود را بنویسید تا گفتگو را شروع کنیم",
            Locale::En => "Type a message to start the conversation",
        }
    }

    pub fn prompt_label(&self) -> &'static str {
        match self {
            Locale::Fa => "پیام خود را بنویسید",
            Locale::En => "Type your message",
        }
    }

    pub fn busy_notice(&self) -> &'static str {
        match self {
            Locale::Fa => "لطفاً تا پایان پاسخ قبلی صبر کنید.",
            Locale::En => "Please wait for the current reply to finish.",
        }
    }

    pub fn assistant_name(&self) -> &'static str {
        match self {
            Locale::Fa => "دستیار هوشمند",
            Locale::En => "Assistant",
        }
    }

    /// `HH:MM` in the locale's digits.
    pub fn format_time<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> String {
        let plain = format!("{:02}:{:02}", time.hour(), time.minute());
        match self {
            Locale::Fa => to_persian_digits(&plain),
            Locale::En => plain,
        }
    }
}

fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32(0x06f0 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Fa => write!(f, "fa"),
            Locale::En => write!(f, "en"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLocaleError {
    message: String,
}

impl fmt::Display for ParseLocaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLocaleError {}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fa" | "fa-ir" => Ok(Locale::Fa),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            _ =>
                Err(ParseLocaleError {
                    message: format!("Unsupported locale: '{}'", s),
                }),
        }
    }
}
