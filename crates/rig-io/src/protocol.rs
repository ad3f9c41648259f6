//! Text record format shared by the rig and the host collector.
//!
//! One record per line, seven comma-separated fields in [`RECORD_TAGS`]
//! order. Motor speed is an integer, gearbox speed has two decimals and the
//! remaining five fields three.

use rig_core::tags::{self, RECORD_TAGS};
use rig_core::Measurement;
use thiserror::Error;

pub const FIELD_SEPARATOR: char = ',';

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("empty line")]
    Empty,
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field {field} is not a number: {value:?}")]
    BadNumber { field: &'static str, value: String },
}

/// CSV header row matching the record field order.
pub fn header_line() -> String {
    RECORD_TAGS
        .iter()
        .map(|tag| tag.header)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn encode_record(record: &Measurement) -> String {
    format!(
        "{},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3}",
        record.motor_rpm,
        record.gearbox_rpm,
        record.force_n,
        record.torque_nm,
        record.input_power_w,
        record.output_power_w,
        record.efficiency_pct,
    )
}

pub fn decode_record(line: &str) -> Result<Measurement, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(RecordError::Empty);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() != RECORD_TAGS.len() {
        return Err(RecordError::FieldCount {
            expected: RECORD_TAGS.len(),
            found: fields.len(),
        });
    }

    let mut values = [0.0f64; 7];
    for ((slot, raw), tag) in values.iter_mut().zip(&fields).zip(RECORD_TAGS.iter()) {
        *slot = parse_field(tag.header, raw)?;
    }

    let motor_rpm = values[0];
    if motor_rpm < 0.0 || motor_rpm > f64::from(u32::MAX) {
        return Err(RecordError::BadNumber {
            field: tags::MOTOR_RPM.header,
            value: fields[0].to_string(),
        });
    }

    Ok(Measurement {
        motor_rpm: motor_rpm.round() as u32,
        gearbox_rpm: values[1],
        force_n: values[2],
        torque_nm: values[3],
        input_power_w: values[4],
        output_power_w: values[5],
        efficiency_pct: values[6],
    })
}

fn parse_field(field: &'static str, raw: &str) -> Result<f64, RecordError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordError::BadNumber {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement {
            motor_rpm: 600,
            gearbox_rpm: 40.0,
            force_n: 9.81,
            torque_nm: 0.981,
            input_power_w: 12.0,
            output_power_w: 4.1092,
            efficiency_pct: 34.2433,
        }
    }

    #[test]
    fn encodes_fixed_precision() {
        assert_eq!(
            encode_record(&sample()),
            "600,40.00,9.810,0.981,12.000,4.109,34.243"
        );
    }

    #[test]
    fn zero_efficiency_encodes_as_three_zeros() {
        let record = Measurement {
            input_power_w: 0.4,
            efficiency_pct: 0.0,
            ..sample()
        };
        let line = encode_record(&record);
        assert!(line.ends_with(",0.400,4.109,0.000"), "{}", line);
    }

    #[test]
    fn header_matches_field_order() {
        assert_eq!(
            header_line(),
            "MotorRPM,GearboxRPM,Force(N),Torque(Nm),InputPower(W),OutputPower(W),Efficiency(%)"
        );
    }

    #[test]
    fn rejects_short_and_long_lines() {
        assert_eq!(
            decode_record("600,40.00,1.0"),
            Err(RecordError::FieldCount {
                expected: 7,
                found: 3
            })
        );
        assert!(decode_record("1,2,3,4,5,6,7,8").is_err());
        assert_eq!(decode_record("   \r\n"), Err(RecordError::Empty));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = decode_record("600,40.00,x,0.981,12.000,4.109,34.243").unwrap_err();
        assert!(matches!(err, RecordError::BadNumber { field: "Force(N)", .. }));
        assert!(decode_record("Failed to find power sensor").is_err());
        assert!(decode_record("-5,40.00,1,1,1,1,1").is_err());
        assert!(decode_record("600,NaN,1,1,1,1,1").is_err());
    }
}
