use chrono::NaiveDate;

use crate::utils::{deserialize_subfield, is_subfield_token, serialize_subfield};

/// The 80 byte recording identification field.
///
/// The EDF+ convention is `Startdate dd-MMM-yyyy code technician equipment`
/// with optional extra tokens, using the same `_`/`X` rules as the patient
/// field. Anything else is kept as an opaque string, so reading this field
/// never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingId {
    Structured {
        startdate: Option<NaiveDate>,
        code: Option<String>,
        technician: Option<String>,
        equipment: Option<String>,
        additional: Vec<String>,
    },
    Opaque(String),
}

impl Default for RecordingId {
    fn default() -> Self {
        RecordingId::Opaque(String::new())
    }
}

impl RecordingId {
    /// Decomposes the trimmed field value, degrading to
    /// [`RecordingId::Opaque`] when it does not follow the convention.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let parts = trimmed.splitn(6, ' ').collect::<Vec<_>>();

        if parts.len() < 5
            || parts[0] != "Startdate"
            || !parts[1..5].iter().all(|t| is_subfield_token(t))
        {
            return RecordingId::Opaque(trimmed.to_string());
        }

        let startdate = match parts[1] {
            "X" => None,
            token if is_startdate_token(token) => {
                match NaiveDate::parse_from_str(token, "%d-%b-%Y") {
                    Ok(date) => Some(date),
                    Err(_) => return RecordingId::Opaque(trimmed.to_string()),
                }
            }
            _ => return RecordingId::Opaque(trimmed.to_string()),
        };

        let additional = parts
            .get(5)
            .map(|rest| rest.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        RecordingId::Structured {
            startdate,
            code: deserialize_subfield(parts[2]),
            technician: deserialize_subfield(parts[3]),
            equipment: deserialize_subfield(parts[4]),
            additional,
        }
    }

    /// Reassembles the field value. Extra tokens are appended verbatim.
    pub fn encode(&self) -> String {
        match self {
            RecordingId::Opaque(value) => value.clone(),
            RecordingId::Structured {
                startdate,
                code,
                technician,
                equipment,
                additional,
            } => {
                let startdate = startdate
                    .map(|d| d.format("%d-%b-%Y").to_string().to_uppercase())
                    .unwrap_or("X".to_string());
                let code = serialize_subfield(code.as_deref());
                let technician = serialize_subfield(technician.as_deref());
                let equipment = serialize_subfield(equipment.as_deref());

                let mut value = format!(
                    "Startdate {} {} {} {}",
                    startdate, code, technician, equipment
                );
                for token in additional {
                    value.push(' ');
                    value.push_str(token);
                }
                value
            }
        }
    }

    /// The start date carried by the subfields, when present. This is the
    /// four digit year authority; the prelude date only spans 1985..=2084.
    pub fn startdate(&self) -> Option<NaiveDate> {
        match self {
            RecordingId::Structured { startdate, .. } => *startdate,
            RecordingId::Opaque(_) => None,
        }
    }
}

/// `dd-MMM-yyyy` shape: two digits, dash, three word characters, dash,
/// four digits.
fn is_startdate_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 11
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[2] == b'-'
        && bytes[3..6]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        && bytes[6] == b'-'
        && bytes[7..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_the_edfplus_example() {
        let parsed = RecordingId::parse("Startdate 16-SEP-1987 PSG-1234/1987 NN Telemetry03");
        assert_eq!(
            parsed,
            RecordingId::Structured {
                startdate: Some(NaiveDate::from_ymd_opt(1987, 9, 16).unwrap()),
                code: Some("PSG-1234/1987".to_string()),
                technician: Some("NN".to_string()),
                equipment: Some("Telemetry03".to_string()),
                additional: Vec::new(),
            }
        );
        assert_eq!(
            parsed.encode(),
            "Startdate 16-SEP-1987 PSG-1234/1987 NN Telemetry03"
        );
    }

    #[test]
    fn missing_startdate_is_x() {
        let parsed = RecordingId::parse("Startdate X X X X");
        assert_eq!(parsed.startdate(), None);
        assert_eq!(parsed.encode(), "Startdate X X X X");
    }

    #[test]
    fn degrades_to_opaque() {
        assert_eq!(
            RecordingId::parse("Hospital ward 3 overnight recording"),
            RecordingId::Opaque("Hospital ward 3 overnight recording".to_string())
        );
        assert_eq!(
            RecordingId::parse("Startdate 16-XYZ-1987 CODE TECH EQUIP"),
            RecordingId::Opaque("Startdate 16-XYZ-1987 CODE TECH EQUIP".to_string())
        );
    }
}
