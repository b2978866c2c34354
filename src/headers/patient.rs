use std::fmt::Display;

use chrono::NaiveDate;

use crate::utils::{deserialize_subfield, is_subfield_token, serialize_subfield};

/// The 80 byte patient identification field.
///
/// The EDF+ convention stores four space separated subfields
/// `code sex birthdate name`, optionally followed by extra tokens. Spaces
/// inside a subfield are written as `_`, a missing subfield as `X` and the
/// birthdate as upper-case `dd-MMM-yyyy`. Values that do not follow the
/// convention (as in plain EDF files) are kept as an opaque string, so
/// reading this field never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientId {
    Structured {
        code: Option<String>,
        sex: Option<Sex>,
        birthdate: Option<NaiveDate>,
        name: Option<String>,
        additional: Vec<String>,
    },
    Opaque(String),
}

impl Default for PatientId {
    fn default() -> Self {
        PatientId::Opaque(String::new())
    }
}

impl PatientId {
    /// Decomposes the trimmed field value. The value degrades to
    /// [`PatientId::Opaque`] when it does not follow the subfield
    /// convention or when a subfield cannot be interpreted.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let parts = trimmed.splitn(5, ' ').collect::<Vec<_>>();

        if parts.len() < 4 || !parts[..4].iter().all(|t| is_subfield_token(t)) {
            return PatientId::Opaque(trimmed.to_string());
        }

        let sex = match parts[1] {
            "X" => None,
            token => match Sex::from_token(token) {
                Some(sex) => Some(sex),
                None => return PatientId::Opaque(trimmed.to_string()),
            },
        };

        let birthdate = match parts[2] {
            "X" => None,
            token => match NaiveDate::parse_from_str(token, "%d-%b-%Y") {
                Ok(date) => Some(date),
                Err(_) => return PatientId::Opaque(trimmed.to_string()),
            },
        };

        let additional = parts
            .get(4)
            .map(|rest| rest.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        PatientId::Structured {
            code: deserialize_subfield(parts[0]),
            sex,
            birthdate,
            name: deserialize_subfield(parts[3]),
            additional,
        }
    }

    /// Reassembles the field value. Extra tokens are appended verbatim.
    pub fn encode(&self) -> String {
        match self {
            PatientId::Opaque(value) => value.clone(),
            PatientId::Structured {
                code,
                sex,
                birthdate,
                name,
                additional,
            } => {
                let code = serialize_subfield(code.as_deref());
                let sex = sex.as_ref().map(Sex::to_string).unwrap_or("X".to_string());
                let birthdate = birthdate
                    .map(|d| d.format("%d-%b-%Y").to_string().to_uppercase())
                    .unwrap_or("X".to_string());
                let name = serialize_subfield(name.as_deref());

                let mut value = format!("{} {} {} {}", code, sex, birthdate, name);
                for token in additional {
                    value.push(' ');
                    value.push_str(token);
                }
                value
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "F" => Some(Self::Female),
            "M" => Some(Self::Male),
            _ => None,
        }
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Female => write!(f, "F"),
            Self::Male => write!(f, "M"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_the_edfplus_example() {
        let parsed = PatientId::parse("MCH-0234567 F 30-MAY-1951 Haagse_Harry");
        assert_eq!(
            parsed,
            PatientId::Structured {
                code: Some("MCH-0234567".to_string()),
                sex: Some(Sex::Female),
                birthdate: Some(NaiveDate::from_ymd_opt(1951, 5, 30).unwrap()),
                name: Some("Haagse Harry".to_string()),
                additional: Vec::new(),
            }
        );
        assert_eq!(parsed.encode(), "MCH-0234567 F 30-MAY-1951 Haagse_Harry");
    }

    #[test]
    fn missing_subfields_round_trip_as_x() {
        let parsed = PatientId::parse("X X X X");
        assert_eq!(
            parsed,
            PatientId::Structured {
                code: None,
                sex: None,
                birthdate: None,
                name: None,
                additional: Vec::new(),
            }
        );
        assert_eq!(parsed.encode(), "X X X X");
    }

    #[test]
    fn extra_tokens_are_kept_verbatim() {
        let parsed = PatientId::parse("PAT-1 M X John_Doe extra info");
        match &parsed {
            PatientId::Structured { additional, .. } => {
                assert_eq!(additional, &vec!["extra".to_string(), "info".to_string()]);
            }
            other => panic!("expected structured value, got {other:?}"),
        }
        assert_eq!(parsed.encode(), "PAT-1 M X John_Doe extra info");
    }

    #[test]
    fn degrades_to_opaque() {
        assert_eq!(
            PatientId::parse("just a free text patient field of an old file"),
            PatientId::Opaque("just a free text patient field of an old file".to_string())
        );
        // a matching shape with an uninterpretable subfield also degrades
        assert_eq!(
            PatientId::parse("PAT-1 Q X John_Doe"),
            PatientId::Opaque("PAT-1 Q X John_Doe".to_string())
        );
        assert_eq!(
            PatientId::parse("PAT-1 M 99-XXX-1999 John_Doe"),
            PatientId::Opaque("PAT-1 M 99-XXX-1999 John_Doe".to_string())
        );
    }
}
