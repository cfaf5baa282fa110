use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};

use crate::person::NewPerson;

/// Parses a people list in CSV format.
///
/// Expects a header row with `first_name,last_name,email,ip_address`; any other
/// column, such as an exported `id`, is ignored.
pub struct PeopleCsvParser<R> {
    iter: DeserializeRecordsIntoIter<R, NewPerson>,
}

impl<R> PeopleCsvParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for PeopleCsvParser<R>
where
    R: Read,
{
    type Item = (u64, Result<NewPerson, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_people() {
        let rows: Vec<_> = PeopleCsvParser::new(
            "first_name, last_name, email, ip_address\n\
             Grace, Hopper, grace@example.com, 192.168.0.1\n\
             Alan,Turing\n"
                .as_bytes(),
        )
        .collect();
        assert_eq!(rows.len(), 2);

        let grace = rows[0].1.as_ref().unwrap();
        assert_eq!(grace.last_name, "Hopper");
        assert_eq!(grace.ip_address, "192.168.0.1");

        // missing columns
        assert!(rows[1].1.is_err());
        assert!(rows[1].0 > rows[0].0);
    }
}
