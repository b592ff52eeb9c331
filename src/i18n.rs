//! Bilingual UI text.
//!
//! Static English and Russian tables plus the date formatting used by the
//! renderers. The active [`Language`] is persisted through
//! [`crate::prefs::PreferenceStore`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    pub fn translations(&self) -> &'static Translations {
        match self {
            Language::En => &EN,
            Language::Ru => &RU,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ru" => Ok(Language::Ru),
            other => Err(format!("unsupported language {:?} (expected en or ru)", other)),
        }
    }
}

#[derive(Debug)]
pub struct Translations {
    pub header: HeaderText,
    pub side_menu: SideMenuText,
    pub news_card: NewsCardText,
    pub date_separator: DateSeparatorText,
    pub news_list: NewsListText,
    pub common: CommonText,
    /// Month names in the form used after a day number.
    pub months: [&'static str; 12],
}

#[derive(Debug)]
pub struct HeaderText {
    pub title: &'static str,
}

#[derive(Debug)]
pub struct SideMenuText {
    pub title: &'static str,
    pub language: &'static str,
    pub language_selector: &'static str,
    pub home: &'static str,
    pub politics: &'static str,
    pub technology: &'static str,
    pub sports: &'static str,
    pub culture: &'static str,
    pub version: &'static str,
}

#[derive(Debug)]
pub struct NewsCardText {
    pub read_article: &'static str,
    pub words: &'static str,
}

#[derive(Debug)]
pub struct DateSeparatorText {
    pub today: &'static str,
    pub yesterday: &'static str,
}

#[derive(Debug)]
pub struct NewsListText {
    pub loading_error: &'static str,
    pub retry_button: &'static str,
    pub end_of_archive: &'static str,
    pub loading: &'static str,
}

#[derive(Debug)]
pub struct CommonText {
    pub loading: &'static str,
    pub error: &'static str,
}

static EN: Translations = Translations {
    header: HeaderText {
        title: "News",
    },
    side_menu: SideMenuText {
        title: "Menu",
        language: "Language",
        language_selector: "Select language",
        home: "Home",
        politics: "Politics",
        technology: "Technology",
        sports: "Sports",
        culture: "Culture",
        version: concat!("Version ", env!("CARGO_PKG_VERSION")),
    },
    news_card: NewsCardText {
        read_article: "Read article",
        words: "words",
    },
    date_separator: DateSeparatorText {
        today: "Today",
        yesterday: "Yesterday",
    },
    news_list: NewsListText {
        loading_error: "An error occurred while loading news",
        retry_button: "Try again",
        end_of_archive: "You have reached the beginning of the news archive",
        loading: "Loading news...",
    },
    common: CommonText {
        loading: "Loading...",
        error: "Error",
    },
    months: [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ],
};

static RU: Translations = Translations {
    header: HeaderText {
        title: "Новости",
    },
    side_menu: SideMenuText {
        title: "Меню",
        language: "Язык",
        language_selector: "Выберите язык",
        home: "Главная",
        politics: "Политика",
        technology: "Технологии",
        sports: "Спорт",
        culture: "Культура",
        version: concat!("Версия ", env!("CARGO_PKG_VERSION")),
    },
    news_card: NewsCardText {
        read_article: "Читать статью",
        words: "слов",
    },
    date_separator: DateSeparatorText {
        today: "Сегодня",
        yesterday: "Вчера",
    },
    news_list: NewsListText {
        loading_error: "Произошла ошибка при загрузке новостей",
        retry_button: "Попробовать снова",
        end_of_archive: "Вы достигли начала архива новостей",
        loading: "Загружаются новости...",
    },
    common: CommonText {
        loading: "Загрузка...",
        error: "Ошибка",
    },
    months: [
        "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября",
        "октября", "ноября", "декабря",
    ],
};

/// Label for a date separator, e.g. `Today, 2 January 2024`.
///
/// `today` is the viewer's current calendar day.
pub fn separator_label(date: NaiveDate, today: NaiveDate, language: Language) -> String {
    let t = language.translations();
    let formatted = format!(
        "{} {} {}",
        date.day(),
        t.months[date.month0() as usize],
        date.year()
    );

    if date == today {
        format!("{}, {}", t.date_separator.today, formatted)
    } else if today.pred_opt() == Some(date) {
        format!("{}, {}", t.date_separator.yesterday, formatted)
    } else {
        formatted
    }
}

/// Absolute card timestamp, always English: `Feb 26, 2023, 16.32 PM`.
pub fn card_timestamp(published: &DateTime<FixedOffset>) -> String {
    published.format("%b %-d, %Y, %H.%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" RU ".parse::<Language>().unwrap(), Language::Ru);
        assert!("de".parse::<Language>().is_err());
        assert_eq!(Language::default(), Language::En);
        assert_eq!(Language::Ru.to_string(), "ru");
    }

    #[test]
    fn test_translations_differ_by_language() {
        assert_eq!(Language::En.translations().header.title, "News");
        assert_eq!(Language::Ru.translations().header.title, "Новости");
        assert_eq!(Language::Ru.translations().news_card.words, "слов");
    }

    #[test]
    fn test_separator_label_relative_days() {
        let today = date(2024, 1, 2);
        assert_eq!(
            separator_label(today, today, Language::En),
            "Today, 2 January 2024"
        );
        assert_eq!(
            separator_label(date(2024, 1, 1), today, Language::Ru),
            "Вчера, 1 января 2024"
        );
        assert_eq!(
            separator_label(date(2023, 12, 25), today, Language::En),
            "25 December 2023"
        );
    }

    #[test]
    fn test_card_timestamp_format() {
        let ts = DateTime::parse_from_rfc3339("2023-02-26T16:32:00+00:00").unwrap();
        assert_eq!(card_timestamp(&ts), "Feb 26, 2023, 16.32 PM");
    }
}
