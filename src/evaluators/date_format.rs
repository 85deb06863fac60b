use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};


/// Date format of a site, either strftime (`%Y-%m-%d`) or legacy date letters (`Y-m-d`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    strftime: String,
    reset: bool,
}


impl DateFormat {
    /// Read a format definition
    pub fn new(format: &str) -> DateFormat {
        if format.contains('%') {
            DateFormat {
                strftime: format.to_string(),
                reset: false,
            }
        } else {
            DateFormat {
                strftime: translate_letters(format),
                reset: format.contains('!') || format.contains('|'),
            }
        }
    }


    /// Format in strftime notation
    pub fn strftime(&self) -> &str {
        &self.strftime
    }


    /// Parse text. Fields missing from the format are taken from `now`, or zeroed for resetting formats.
    pub fn parse(&self, text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let format = self.strftime.as_str();
        DateTime::parse_from_str(text, format)
            .map(|date| date.with_timezone(&Local).naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(text, format))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .map(|date| date.and_time(self.missing_time(now)))
            })
            .or_else(|| {
                NaiveTime::parse_from_str(text, format)
                    .ok()
                    .map(|time| now.date().and_time(time))
            })
    }


    fn missing_time(&self, now: NaiveDateTime) -> NaiveTime {
        if self.reset {
            NaiveTime::default()
        } else {
            now.time()
        }
    }
}


/// Translate legacy date letters to strftime
fn translate_letters(format: &str) -> String {
    let mut strftime = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(letter) = chars.next() {
        let replacement = match letter {
            'Y' => "%Y",
            'y' => "%y",
            'm' | 'n' => "%m",
            'd' | 'j' => "%d",
            'M' => "%b",
            'F' => "%B",
            'D' => "%a",
            'l' => "%A",
            'H' | 'G' => "%H",
            'h' | 'g' => "%I",
            'i' => "%M",
            's' => "%S",
            'A' | 'a' => "%p",
            'U' => "%s",
            'O' => "%z",
            'P' => "%:z",
            '!' | '|' => "",
            '\\' => {
                if let Some(escaped) = chars.next() {
                    strftime.push(escaped);
                }
                continue;
            }
            other => {
                strftime.push(other);
                continue;
            }
        };
        strftime.push_str(replacement);
    }
    strftime
}
