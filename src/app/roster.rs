//! People kept in one file under several record tags.

use crate::domain::model::{FieldKind, Record, Shape, Value};
use crate::domain::ports::Entity;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_range, Validate,
};
use std::fmt;

pub const STUDENT_TAG: &str = "roster::Student";
pub const MUSICIAN_TAG: &str = "roster::Musician";
pub const PILOT_TAG: &str = "roster::Pilot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub const VARIANTS: [&'static str; 3] = ["Male", "Female", "Unknown"];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Unknown" => Ok(Gender::Unknown),
            other => Err(StoreError::decode(format!("unknown gender '{}'", other))),
        }
    }
}

/// Fields every person carries.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonInfo {
    pub first_name: String,
    pub last_name: String,
    pub passport_id: i64,
    pub gender: Gender,
}

impl PersonInfo {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        passport_id: i64,
        gender: Gender,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            passport_id,
            gender,
        }
    }

    fn shape(tag: &str) -> Shape {
        Shape::new(tag)
            .field("FirstName", FieldKind::Text)
            .field("LastName", FieldKind::Text)
            .field("PassportId", FieldKind::Integer)
            .field("Gender", FieldKind::enumeration(Gender::VARIANTS))
    }

    fn record(&self, tag: &str) -> Record {
        Record::new(tag)
            .with("FirstName", Value::Text(self.first_name.clone()))
            .with("LastName", Value::Text(self.last_name.clone()))
            .with("PassportId", Value::Integer(self.passport_id))
            .with("Gender", Value::Enum(self.gender.as_str().to_string()))
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            first_name: record.text("FirstName")?,
            last_name: record.text("LastName")?,
            passport_id: record.integer("PassportId")?,
            gender: Gender::parse(&record.text("Gender")?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Person {
    Student {
        info: PersonInfo,
        student_id: String,
        year: i64,
        residence: String,
    },
    Musician {
        info: PersonInfo,
        instrument: String,
        skill_level: i64,
    },
    Pilot {
        info: PersonInfo,
        license_id: String,
        flight_hours: i64,
        /// Runtime state only.
        on_flight: bool,
    },
}

impl Person {
    pub fn info(&self) -> &PersonInfo {
        match self {
            Person::Student { info, .. }
            | Person::Musician { info, .. }
            | Person::Pilot { info, .. } => info,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Person::Student { .. } => STUDENT_TAG,
            Person::Musician { .. } => MUSICIAN_TAG,
            Person::Pilot { .. } => PILOT_TAG,
        }
    }

    /// Raises a musician's skill by [`PRACTICE_GAIN`], capped at [`MAX_SKILL`].
    /// `false` for anyone who is not a musician.
    pub fn practice(&mut self) -> bool {
        match self {
            Person::Musician { skill_level, .. } => {
                *skill_level = (*skill_level + PRACTICE_GAIN).min(MAX_SKILL);
                true
            }
            _ => false,
        }
    }

    /// A student whose residence names a hostel room (`Hostel <block>.<room>`).
    pub fn lives_in_hostel(&self) -> bool {
        matches!(self, Person::Student { residence, .. } if residence.contains('.'))
    }
}

pub const PRACTICE_GAIN: i64 = 5;
pub const MAX_SKILL: i64 = 100;

/// Hands out hostel rooms by gender: block 1 for men, block 2 for women and the
/// single room 3.301 for everyone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostel {
    next_male: i64,
    next_female: i64,
}

impl Default for Hostel {
    fn default() -> Self {
        Self {
            next_male: 101,
            next_female: 201,
        }
    }
}

impl Hostel {
    /// Continues numbering after the rooms already taken by `people`.
    pub fn after<'a>(people: impl IntoIterator<Item = &'a Person>) -> Self {
        let mut hostel = Self::default();
        for person in people {
            let Person::Student { residence, .. } = person else {
                continue;
            };
            let Some((block, room)) = residence
                .strip_prefix("Hostel ")
                .and_then(|r| r.split_once('.'))
            else {
                continue;
            };
            let Ok(room) = room.trim().parse::<i64>() else {
                continue;
            };
            match block.trim() {
                "1" => hostel.next_male = hostel.next_male.max(room + 1),
                "2" => hostel.next_female = hostel.next_female.max(room + 1),
                _ => {}
            }
        }
        hostel
    }

    pub fn assign(&mut self, gender: Gender) -> String {
        match gender {
            Gender::Male => {
                let room = format!("Hostel 1.{}", self.next_male);
                self.next_male += 1;
                room
            }
            Gender::Female => {
                let room = format!("Hostel 2.{}", self.next_female);
                self.next_female += 1;
                room
            }
            Gender::Unknown => "Hostel 3.301".to_string(),
        }
    }
}

impl Entity for Person {
    fn shapes() -> Vec<Shape> {
        vec![
            PersonInfo::shape(STUDENT_TAG)
                .field("StudentId", FieldKind::Text)
                .field("Year", FieldKind::Integer)
                .field("Residence", FieldKind::Text),
            PersonInfo::shape(MUSICIAN_TAG)
                .field("Instrument", FieldKind::Text)
                .field("SkillLevel", FieldKind::Integer),
            PersonInfo::shape(PILOT_TAG)
                .field("LicenseId", FieldKind::Text)
                .field("FlightHours", FieldKind::Integer)
                .derived("IsOnFlight", FieldKind::Boolean),
        ]
    }

    fn to_record(&self) -> Record {
        let record = self.info().record(self.tag());
        match self {
            Person::Student {
                student_id,
                year,
                residence,
                ..
            } => record
                .with("StudentId", Value::Text(student_id.clone()))
                .with("Year", Value::Integer(*year))
                .with("Residence", Value::Text(residence.clone())),
            Person::Musician {
                instrument,
                skill_level,
                ..
            } => record
                .with("Instrument", Value::Text(instrument.clone()))
                .with("SkillLevel", Value::Integer(*skill_level)),
            Person::Pilot {
                license_id,
                flight_hours,
                on_flight,
                ..
            } => record
                .with("LicenseId", Value::Text(license_id.clone()))
                .with("FlightHours", Value::Integer(*flight_hours))
                .with("IsOnFlight", Value::Boolean(*on_flight)),
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        let info = PersonInfo::from_record(record)?;
        match record.tag.as_str() {
            STUDENT_TAG => Ok(Person::Student {
                info,
                student_id: record.text("StudentId")?,
                year: record.integer("Year")?,
                residence: record.text("Residence")?,
            }),
            MUSICIAN_TAG => Ok(Person::Musician {
                info,
                instrument: record.text("Instrument")?,
                skill_level: record.integer("SkillLevel")?,
            }),
            PILOT_TAG => Ok(Person::Pilot {
                info,
                license_id: record.text("LicenseId")?,
                flight_hours: record.integer("FlightHours")?,
                on_flight: false,
            }),
            other => Err(StoreError::decode(format!("{} is not a person", other))),
        }
    }
}

impl Validate for Person {
    fn validate(&self) -> Result<()> {
        let info = self.info();
        validate_non_empty_string("first_name", &info.first_name)?;
        validate_non_empty_string("last_name", &info.last_name)?;
        match self {
            Person::Student {
                student_id, year, ..
            } => {
                validate_non_empty_string("student_id", student_id)?;
                validate_range("year", *year, 1, 6)?;
            }
            Person::Musician { skill_level, .. } => {
                validate_range("skill_level", *skill_level, 0, 100)?;
            }
            Person::Pilot {
                license_id,
                flight_hours,
                ..
            } => {
                validate_non_empty_string("license_id", license_id)?;
                validate_non_negative("flight_hours", *flight_hours)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.info();
        write!(
            f,
            "{} {} ({}) | passport {}",
            info.first_name,
            info.last_name,
            info.gender.as_str(),
            info.passport_id
        )?;
        match self {
            Person::Student { year, residence, .. } => {
                write!(f, " | student, year {}, {}", year, residence)
            }
            Person::Musician {
                instrument,
                skill_level,
                ..
            } => write!(f, " | musician, {} at level {}", instrument, skill_level),
            Person::Pilot { flight_hours, .. } => {
                write!(f, " | pilot, {} flight hours", flight_hours)
            }
        }
    }
}
