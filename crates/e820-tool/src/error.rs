use std::{error::Error, fmt};

use e820::E820Error;
use snafu::{Location, Snafu};

use crate::term::{Color, WithFg};

#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct CliError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn Error>, Some)))]
    source: Option<Box<dyn Error>>,
}

impl CliError {
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// Prints an error with its chain of causes.
pub struct Report<E> {
    error: E,
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

fn location_of(error: &(dyn Error + 'static)) -> Option<String> {
    if let Some(err) = error.downcast_ref::<CliError>() {
        return Some(err.location().to_string());
    }
    error
        .downcast_ref::<E820Error>()
        .map(|err| err.location().to_string())
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", WithFg::new(Color::Red, &self.error))?;
        if let Some(loc) = location_of(&self.error) {
            writeln!(f, "  at {}", WithFg::new(Color::DarkGray, loc))?;
        }
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {}", WithFg::new(Color::Red, s))?;
            if let Some(loc) = location_of(s) {
                writeln!(f, "      at {}", WithFg::new(Color::DarkGray, loc))?;
            }
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}
