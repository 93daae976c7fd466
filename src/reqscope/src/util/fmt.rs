use std::fmt::{Display, Formatter, Result as FmtResult};

/// Renders a list of errors one per line, numbered from 1.
pub struct Aggregated<'a, E> {
    errors: &'a [E],
}

impl<'a, E> Aggregated<'a, E> {
    pub fn new(errors: &'a [E]) -> Self {
        Self { errors }
    }
}

impl<E: Display> Display for Aggregated<'_, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "{:4}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregated_numbers_each_error() {
        let errors = ["first", "second"];
        assert_eq!(
            Aggregated::new(&errors).to_string(),
            "   1: first\n   2: second\n"
        );
    }
}
