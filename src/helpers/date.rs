//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;

use crate::config::{ConfigError, SiteConfig};

/// Parse a publication date as sent by the content API
///
/// Accepts RFC 3339 (`2021-03-15T19:25:28+00:00`) as well as the
/// colon-less offset form the API actually emits (`2021-03-15T19:25:28+0000`).
pub fn parse_publication_date(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
}

/// Formats publication dates with a fixed locale, timezone and pattern
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
    format: String,
}

impl DateFormatter {
    /// Create a formatter
    ///
    /// `language` is a BCP 47 or POSIX locale name (`pt-BR`, `en_US`),
    /// `timezone` an IANA name (empty means UTC) and `format` a strftime
    /// pattern such as `%d %b %Y`.
    pub fn new(language: &str, timezone: &str, format: &str) -> Result<Self, ConfigError> {
        let locale = parse_locale(language)?;

        let timezone = if timezone.trim().is_empty() {
            Tz::UTC
        } else {
            timezone
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::Timezone(timezone.to_string()))?
        };

        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::DateFormat(format.to_string()));
        }

        Ok(Self {
            locale,
            timezone,
            format: format.to_string(),
        })
    }

    /// Create a formatter from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(&config.language, &config.timezone, &config.date_format)
    }

    /// Format a date, e.g. "15 mar 2021" for `pt-BR`
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.format, self.locale)
            .to_string()
    }

    /// Parse and format an API date string
    pub fn format_str(&self, value: &str) -> Result<String, chrono::ParseError> {
        parse_publication_date(value).map(|date| self.format(&date))
    }
}

fn parse_locale(language: &str) -> Result<Locale, ConfigError> {
    let name = language.trim().replace('-', "_");
    Locale::try_from(name.as_str()).map_err(|_| ConfigError::Locale(language.to_string()))
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
