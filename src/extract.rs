// src/extract.rs
//
// Field extraction from text lines.
//
// Line format:
//   <anything>Voltaje: <digits>.<digits> V<anything>
//
// Only the first occurrence that matches the full shape is used. Lines that
// don't match are the common case and simply yield no reading.

use serde::Serialize;

pub const VOLTAGE_FIELD: &str = "Voltaje";
pub const VOLTAGE_UNIT: &str = "V";

/// A numeric value pulled out of a line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub field_name: String,
    pub value: f64,
    pub unit: String,
}

/// Matches `<field>: <int>.<frac> <unit>` anywhere in a line.
#[derive(Clone, Debug)]
pub struct FieldExtractor {
    field_name: String,
    unit: String,
    prefix: String,
    suffix: String,
}

impl FieldExtractor {
    pub fn new(field_name: &str, unit: &str) -> Self {
        FieldExtractor {
            field_name: field_name.to_string(),
            unit: unit.to_string(),
            prefix: format!("{}: ", field_name),
            suffix: format!(" {}", unit),
        }
    }

    /// `Voltaje: <v> V`
    pub fn voltage() -> Self {
        Self::new(VOLTAGE_FIELD, VOLTAGE_UNIT)
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Extract a reading, or `None` if the line doesn't contain the pattern.
    pub fn extract(&self, line: &str) -> Option<Reading> {
        line.match_indices(self.prefix.as_str())
            .find_map(|(idx, _)| self.parse_value(&line[idx + self.prefix.len()..]))
            .map(|value| Reading {
                field_name: self.field_name.clone(),
                value,
                unit: self.unit.clone(),
            })
    }

    /// Parse `<int>.<frac><suffix>` at the start of `rest`.
    fn parse_value(&self, rest: &str) -> Option<f64> {
        let bytes = rest.as_bytes();

        let int_len = count_digits(bytes);
        if int_len == 0 || bytes.get(int_len) != Some(&b'.') {
            return None;
        }

        let frac_len = count_digits(&bytes[int_len + 1..]);
        if frac_len == 0 {
            return None;
        }

        let end = int_len + 1 + frac_len;
        if !rest[end..].starts_with(self.suffix.as_str()) {
            return None;
        }

        rest[..end].parse::<f64>().ok()
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::voltage()
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Extract a voltage reading using the default pattern.
pub fn extract(line: &str) -> Option<Reading> {
    FieldExtractor::voltage().extract(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_reading() {
        let reading = extract("Voltaje: 3.50 V").unwrap();
        assert_eq!(reading.field_name, "Voltaje");
        assert_eq!(reading.value, 3.5);
        assert_eq!(reading.unit, "V");
    }

    #[test]
    fn test_extract_with_surrounding_text() {
        assert_eq!(extract("Voltaje: 5.20 V extra text").unwrap().value, 5.2);
        assert_eq!(extract("ADC=201 Voltaje: 3.94 V").unwrap().value, 3.94);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let line = "Voltaje: 4.01 V";
        assert_eq!(extract(line), extract(line));
    }

    #[test]
    fn test_extract_exact_values() {
        for (line, expected) in [
            ("Voltaje: 0.0 V", 0.0),
            ("Voltaje: 4.00 V", 4.0),
            ("Voltaje: 12.345 V", 12.345),
            ("Voltaje: 007.10 V", 7.1),
        ] {
            assert_eq!(extract(line).unwrap().value, expected, "line: {}", line);
        }
    }

    #[test]
    fn test_no_prefix_is_none() {
        assert!(extract("sensor offline").is_none());
        assert!(extract("").is_none());
        assert!(extract("voltaje: 3.50 V").is_none()); // case-sensitive
        assert!(extract("Voltaje 3.50 V").is_none());
    }

    #[test]
    fn test_malformed_number_is_none() {
        assert!(extract("Voltaje: 3 V").is_none());
        assert!(extract("Voltaje: .5 V").is_none());
        assert!(extract("Voltaje: 3. V").is_none());
        assert!(extract("Voltaje: -3.50 V").is_none());
        assert!(extract("Voltaje: 3.50V").is_none());
        assert!(extract("Voltaje: 3.50 mV").is_none());
        assert!(extract("Voltaje: 3.5.0 V").is_none());
        assert!(extract("Voltaje:  3.50 V").is_none());
    }

    #[test]
    fn test_first_full_match_wins() {
        let line = "Voltaje: n/a Voltaje: 2.25 V Voltaje: 9.99 V";
        assert_eq!(extract(line).unwrap().value, 2.25);
    }

    #[test]
    fn test_non_ascii_text_around_match() {
        assert_eq!(extract("Lectura ñ → Voltaje: 1.25 V ✓").unwrap().value, 1.25);
    }

    #[test]
    fn test_custom_field() {
        let extractor = FieldExtractor::new("Corriente", "A");
        let reading = extractor.extract("Corriente: 0.75 A").unwrap();
        assert_eq!(reading.field_name, "Corriente");
        assert_eq!(reading.unit, "A");
        assert_eq!(reading.value, 0.75);
        assert!(extractor.extract("Voltaje: 3.50 V").is_none());
    }
}
