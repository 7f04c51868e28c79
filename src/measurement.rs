use std::{fmt, str::FromStr};

use logos::{Lexer, Logos};
use miette::Diagnostic;
use thiserror::Error;
use time::{macros::format_description, Date, PrimitiveDateTime, Time};

/// Flag value marking a reading as approved by the station.
pub const APPROVED_FLAG: &str = "G";

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t]+")] // Ignore this regex pattern between tokens
enum Token {
    #[regex(r"[0-9]{4}-[0-9]{2}-[0-9]{2}")]
    Date,
    #[regex(r"[0-9]{2}:[0-9]{2}:[0-9]{2}")]
    Time,
    #[regex(r"[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?")]
    Number,
    #[token(";")]
    Separator,
}

/// A single reading of the weather station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub date: Date,
    pub time: Time,
    pub temperature: f64,
    pub approved: bool,
}

impl Measurement {
    pub fn new(date: Date, time: Time, temperature: f64, approved: bool) -> Self {
        Self {
            date,
            time,
            temperature,
            approved,
        }
    }

    /// Key under which the measurement is stored.
    pub fn date_time(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(self.date, self.time)
    }
}

/// Writes the measurement back as a normalised record line: the flag is `G`
/// for approved readings and `Y` for every other one.
impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{:02}:{:02}:{:02};{};{}",
            self.date,
            self.time.hour(),
            self.time.minute(),
            self.time.second(),
            self.temperature,
            if self.approved { APPROVED_FLAG } else { "Y" }
        )
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseMeasurementError {
    #[error("Empty record")]
    Empty,
    #[error("Bad date: `{0}`")]
    BadDate(String),
    #[error("Bad time: `{0}`")]
    BadTime(String),
    #[error("Bad temperature: `{0}`")]
    BadTemperature(String),
    #[error("Missing `;` after the {0}")]
    MissingSeparator(&'static str),
    #[error("Invalid date or time: {0}")]
    InvalidComponent(#[from] time::error::Parse),
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
}

/// Parses a `HH:MM:SS` time of day.
pub fn parse_time(s: &str) -> Result<Time, time::error::Parse> {
    Time::parse(s, format_description!("[hour]:[minute]:[second]"))
}

fn expect_separator(
    lexer: &mut Lexer<Token>,
    after: &'static str,
) -> Result<(), ParseMeasurementError> {
    match lexer.next() {
        Some(Ok(Token::Separator)) => Ok(()),
        _ => Err(ParseMeasurementError::MissingSeparator(after)),
    }
}

/// Parses one `date;time;temperature;flag` record. Everything after the third
/// separator is the flag.
impl FromStr for Measurement {
    type Err = ParseMeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let mut record = Token::lexer(line);

        let date = match record.next() {
            Some(Ok(Token::Date)) => parse_date(record.slice())?,
            None => return Err(ParseMeasurementError::Empty),
            _ => return Err(ParseMeasurementError::BadDate(record.slice().to_string())),
        };
        expect_separator(&mut record, "date")?;

        let time = match record.next() {
            Some(Ok(Token::Time)) => parse_time(record.slice())?,
            _ => return Err(ParseMeasurementError::BadTime(record.slice().to_string())),
        };
        expect_separator(&mut record, "time")?;

        let temperature = match record.next() {
            Some(Ok(Token::Number)) => record
                .slice()
                .parse()
                .map_err(|_| ParseMeasurementError::BadTemperature(record.slice().to_string()))?,
            _ => {
                return Err(ParseMeasurementError::BadTemperature(
                    record.slice().to_string(),
                ))
            }
        };
        expect_separator(&mut record, "temperature")?;

        let approved = record.remainder() == APPROVED_FLAG;

        Ok(Self {
            date,
            time,
            temperature,
            approved,
        })
    }
}
