// src/csv.rs
//
// Population persistence as CSV: one row per macro-classifier.
//
// Column order: the 2L condition scalars (c_i,s_i for center-spread,
// l_i,u_i for the bound representations), then action, prediction, epsilon,
// fitness, experience, time_stamp, action_set_size, numerosity. A header row
// is always present. Loading is all-or-nothing: any malformed row aborts the
// whole load with its line number.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::classifier::Classifier;
use crate::condition::{Condition, Predicate};
use crate::params::Repr;
use crate::population::Population;

/// Persistence errors, with line context for parse failures.
#[derive(Debug, Clone, PartialEq)]
pub enum CsvError {
    Io { path: String, source: String },
    Parse { line: usize, message: String },
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvError::Io { path, source } => {
                write!(f, "failed to access population CSV '{}': {}", path, source)
            }
            CsvError::Parse { line, message } => {
                write!(f, "population CSV line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

/// Number of statistic columns after the condition scalars.
const STAT_COLUMNS: usize = 8;

fn scalar_labels(repr: Repr) -> (&'static str, &'static str) {
    match repr {
        Repr::CenterSpread => ("c", "s"),
        Repr::OrderedBound | Repr::UnorderedBound => ("l", "u"),
    }
}

/// Write the population to `writer` in insertion order.
pub fn write_population<W: Write>(
    writer: &mut W,
    population: &Population,
    repr: Repr,
) -> std::io::Result<()> {
    let length = population
        .iter()
        .next()
        .map(|cl| cl.borrow().condition.len())
        .unwrap_or(0);

    let (first, second) = scalar_labels(repr);
    let mut header: Vec<String> = (0..length)
        .flat_map(|i| [format!("{}{}", first, i), format!("{}{}", second, i)])
        .collect();
    header.extend(
        [
            "action",
            "prediction",
            "epsilon",
            "fitness",
            "experience",
            "time_stamp",
            "action_set_size",
            "numerosity",
        ]
        .map(String::from),
    );
    writeln!(writer, "{}", header.join(","))?;

    for member in population.iter() {
        let cl = member.borrow();
        let mut fields: Vec<String> = cl
            .condition
            .predicates
            .iter()
            .flat_map(|p| [p.v1.to_string(), p.v2.to_string()])
            .collect();
        fields.push(cl.action.to_string());
        fields.push(cl.prediction.to_string());
        fields.push(cl.epsilon.to_string());
        fields.push(cl.fitness.to_string());
        fields.push(cl.experience.to_string());
        fields.push(cl.time_stamp.to_string());
        fields.push(cl.action_set_size.to_string());
        fields.push(cl.numerosity.to_string());
        writeln!(writer, "{}", fields.join(","))?;
    }
    Ok(())
}

/// Save the population to a CSV file.
pub fn save_population(
    path: impl AsRef<Path>,
    population: &Population,
    repr: Repr,
) -> Result<(), CsvError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CsvError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    let mut writer = BufWriter::new(file);
    write_population(&mut writer, population, repr).map_err(|e| CsvError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })
}

/// Parse a population from `reader`. The first line is the header; every
/// following non-empty line must carry 2L + 8 comma-separated fields with a
/// condition length consistent across rows.
pub fn read_population<R: BufRead>(reader: R, repr: Repr) -> Result<Vec<Classifier>, CsvError> {
    let mut classifiers = Vec::new();
    let mut expected_length: Option<usize> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| CsvError::Parse {
            line: line_number,
            message: e.to_string(),
        })?;
        if index == 0 || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < STAT_COLUMNS + 2 || (fields.len() - STAT_COLUMNS) % 2 != 0 {
            return Err(CsvError::Parse {
                line: line_number,
                message: format!(
                    "expected 2L + {} fields for a positive L, got {}",
                    STAT_COLUMNS,
                    fields.len()
                ),
            });
        }
        let length = (fields.len() - STAT_COLUMNS) / 2;
        match expected_length {
            None => expected_length = Some(length),
            Some(expected) if expected != length => {
                return Err(CsvError::Parse {
                    line: line_number,
                    message: format!(
                        "condition length {} does not match earlier rows ({})",
                        length, expected
                    ),
                });
            }
            Some(_) => {}
        }

        let parse_f64 = |value: &str, name: &str| -> Result<f64, CsvError> {
            value.parse::<f64>().map_err(|_| CsvError::Parse {
                line: line_number,
                message: format!("invalid {} value '{}'", name, value),
            })
        };
        let parse_u64 = |value: &str, name: &str| -> Result<u64, CsvError> {
            value.parse::<u64>().map_err(|_| CsvError::Parse {
                line: line_number,
                message: format!("invalid {} value '{}'", name, value),
            })
        };

        let mut predicates = Vec::with_capacity(length);
        for i in 0..length {
            let v1 = parse_f64(fields[2 * i], "condition scalar")?;
            let v2 = parse_f64(fields[2 * i + 1], "condition scalar")?;
            predicates.push(Predicate { v1, v2 });
        }

        let stats = &fields[2 * length..];
        let action = stats[0].parse::<usize>().map_err(|_| CsvError::Parse {
            line: line_number,
            message: format!("invalid action value '{}'", stats[0]),
        })?;
        let numerosity = parse_u64(stats[7], "numerosity")?;
        if numerosity == 0 {
            return Err(CsvError::Parse {
                line: line_number,
                message: "numerosity must be at least 1".to_string(),
            });
        }

        classifiers.push(Classifier {
            condition: Condition::new(repr, predicates),
            action,
            prediction: parse_f64(stats[1], "prediction")?,
            epsilon: parse_f64(stats[2], "epsilon")?,
            fitness: parse_f64(stats[3], "fitness")?,
            experience: parse_u64(stats[4], "experience")?,
            time_stamp: parse_u64(stats[5], "time_stamp")?,
            action_set_size: parse_f64(stats[6], "action_set_size")?,
            numerosity,
        });
    }

    Ok(classifiers)
}

/// Load a population from a CSV file.
pub fn load_population(path: impl AsRef<Path>, repr: Repr) -> Result<Vec<Classifier>, CsvError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CsvError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    read_population(BufReader::new(file), repr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::XcsrParams;

    fn sample_population() -> Population {
        let params = XcsrParams::default();
        let mut population = Population::new();
        let mut a = Classifier::new(
            Condition::new(
                Repr::OrderedBound,
                vec![Predicate { v1: 0.0, v2: 0.5 }, Predicate { v1: 0.25, v2: 1.0 }],
            ),
            0,
            &params,
            3,
            2.5,
        );
        a.prediction = 512.25;
        a.epsilon = 1.5;
        a.fitness = 0.75;
        a.experience = 17;
        a.numerosity = 4;
        population.insert_or_merge(a);
        population.insert_or_merge(Classifier::new(
            Condition::new(
                Repr::OrderedBound,
                vec![Predicate { v1: 0.5, v2: 0.9 }, Predicate { v1: 0.0, v2: 0.1 }],
            ),
            1,
            &params,
            0,
            1.0,
        ));
        population
    }

    #[test]
    fn test_roundtrip_preserves_all_fields() {
        let population = sample_population();
        let mut buffer = Vec::new();
        write_population(&mut buffer, &population, Repr::OrderedBound).unwrap();

        let parsed = read_population(&buffer[..], Repr::OrderedBound).unwrap();
        let original = population.snapshot();
        assert_eq!(parsed.len(), original.len());
        for (a, b) in parsed.iter().zip(&original) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_header_row_is_present() {
        let population = sample_population();
        let mut buffer = Vec::new();
        write_population(&mut buffer, &population, Repr::OrderedBound).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "l0,u0,l1,u1,action,prediction,epsilon,fitness,experience,time_stamp,action_set_size,numerosity"
        );
    }

    #[test]
    fn test_csr_header_uses_center_spread_labels() {
        let params = XcsrParams {
            repr: Repr::CenterSpread,
            ..XcsrParams::default()
        };
        let mut population = Population::new();
        population.insert_or_merge(Classifier::new(
            Condition::new(Repr::CenterSpread, vec![Predicate { v1: 0.5, v2: 0.25 }]),
            0,
            &params,
            0,
            1.0,
        ));
        let mut buffer = Vec::new();
        write_population(&mut buffer, &population, Repr::CenterSpread).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("c0,s0,action"));
    }

    #[test]
    fn test_parse_error_reports_line_number() {
        let data = "l0,u0,action,prediction,epsilon,fitness,experience,time_stamp,action_set_size,numerosity\n\
                    0.0,1.0,0,10,0.1,0.5,3,2,1.5,1\n\
                    0.0,oops,0,10,0.1,0.5,3,2,1.5,1\n";
        let err = read_population(data.as_bytes(), Repr::OrderedBound).unwrap_err();
        match err {
            CsvError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let data = "header\n0.0,1.0,0\n";
        assert!(matches!(
            read_population(data.as_bytes(), Repr::OrderedBound),
            Err(CsvError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_inconsistent_length_is_rejected() {
        let data = "h\n\
                    0.0,1.0,0,10,0.1,0.5,3,2,1.5,1\n\
                    0.0,1.0,0.2,0.4,0,10,0.1,0.5,3,2,1.5,1\n";
        assert!(matches!(
            read_population(data.as_bytes(), Repr::OrderedBound),
            Err(CsvError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_zero_numerosity_is_rejected() {
        let data = "h\n0.0,1.0,0,10,0.1,0.5,3,2,1.5,0\n";
        assert!(matches!(
            read_population(data.as_bytes(), Repr::OrderedBound),
            Err(CsvError::Parse { line: 2, .. })
        ));
    }
}
