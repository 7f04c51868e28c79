//! Text menu asking for a report and its two dates, then printing the result.

use std::{
    fmt::Display,
    io::{self, BufRead, Write},
};

use time::Date;

use crate::{
    measurement::parse_date,
    query::{QueryEngine, QueryError},
};

const MENU: &str = "\
-------------------
1. Average temperatures
2. Missing values
3. Approved values
-------------------
4. Quit";

const NO_MATCH: &str = "No matching values for the provided query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    AverageTemperatures,
    MissingValues,
    ApprovedValues,
}

impl Report {
    fn title(self) -> &'static str {
        match self {
            Self::AverageTemperatures => "Calculate average temperature for dates",
            Self::MissingValues => "List dates with missing values between two dates",
            Self::ApprovedValues => "Calculate percentage of approved values between the two dates",
        }
    }

    fn write(
        self,
        engine: &QueryEngine<'_>,
        from: Date,
        to: Date,
        output: &mut impl Write,
    ) -> io::Result<()> {
        match self {
            Self::AverageTemperatures => present(output, engine.daily_averages(from, to)),
            Self::MissingValues => present(output, engine.daily_missing(from, to)),
            Self::ApprovedValues => present(
                output,
                engine.approved_share(from, to).map(|share| vec![share]),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Report(Report),
    Quit,
}

impl Choice {
    const FIRST: u8 = 1;
    const LAST: u8 = 4;

    fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Report(Report::AverageTemperatures)),
            2 => Some(Self::Report(Report::MissingValues)),
            3 => Some(Self::Report(Report::ApprovedValues)),
            4 => Some(Self::Quit),
            _ => None,
        }
    }
}

pub struct Menu<'a> {
    engine: QueryEngine<'a>,
}

impl<'a> Menu<'a> {
    pub fn new(engine: QueryEngine<'a>) -> Self {
        Self { engine }
    }

    /// Runs until the user quits or `input` is exhausted.
    pub fn run(&self, mut input: impl BufRead, mut output: impl Write) -> io::Result<()> {
        writeln!(output, "** Weather Data **")?;

        while let Some(Choice::Report(report)) = read_choice(&mut input, &mut output)? {
            writeln!(output, "{}", report.title())?;
            let Some((from, to)) = read_range(&mut input, &mut output)? else {
                break;
            };
            report.write(&self.engine, from, to, &mut output)?;
        }

        output.flush()
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn read_choice(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<Option<Choice>> {
    loop {
        writeln!(output, "{MENU}")?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.parse().ok().and_then(Choice::from_number) {
            Some(choice) => return Ok(Some(choice)),
            None => writeln!(
                output,
                "Invalid input. Enter a number between {} and {}",
                Choice::FIRST,
                Choice::LAST
            )?,
        }
    }
}

fn read_date(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<Option<Date>> {
    loop {
        writeln!(output, "Enter date (YYYY-MM-DD): ")?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match parse_date(&line) {
            Ok(date) => return Ok(Some(date)),
            Err(_) => writeln!(output, "Invalid date")?,
        }
    }
}

fn read_range(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<(Date, Date)>> {
    writeln!(output, "Start date (will be included)")?;
    let Some(from) = read_date(input, output)? else {
        return Ok(None);
    };
    writeln!(output, "End date (will be included)")?;
    let Some(to) = read_date(input, output)? else {
        return Ok(None);
    };
    Ok(Some((from, to)))
}

fn present<T: Display>(
    output: &mut impl Write,
    rows: Result<Vec<T>, QueryError>,
) -> io::Result<()> {
    let rows = match rows {
        Ok(rows) => rows,
        Err(error) => {
            writeln!(output, "{error}")?;
            Vec::new()
        }
    };
    if rows.is_empty() {
        writeln!(output, "{NO_MATCH}")?;
    }
    for row in rows {
        writeln!(output, "{row}")?;
    }
    Ok(())
}
