//! Character Form Model
//!
//! A statically typed character sheet. `CharacterRecord::validate_report` gives a
//! structured list of violations usable at submit time, and `validate_field`
//! narrows it to one field for change-time feedback. The point budget is
//! advisory only and never turns into a violation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::album::PhotoRecord;

pub const MAX_ALBUM_PHOTOS: usize = 20;
pub const DEFAULT_POINT_BUDGET: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Orc,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::Human, Race::Elf, Race::Dwarf, Race::Orc];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profession {
    Warrior,
    Mage,
    Rogue,
    Healer,
}

impl Profession {
    pub const ALL: [Profession; 4] = [
        Profession::Warrior,
        Profession::Mage,
        Profession::Rogue,
        Profession::Healer,
    ];
}

impl std::fmt::Display for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::fmt::Display for Profession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The six bounded attributes; each must lie in `1..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Attributes {
    #[validate(range(min = 1, max = 100, message = "Strength must be between 1 and 100"))]
    pub strength: i32,
    #[validate(range(min = 1, max = 100, message = "Dexterity must be between 1 and 100"))]
    pub dexterity: i32,
    #[validate(range(min = 1, max = 100, message = "Constitution must be between 1 and 100"))]
    pub constitution: i32,
    #[validate(range(min = 1, max = 100, message = "Intelligence must be between 1 and 100"))]
    pub intelligence: i32,
    #[validate(range(min = 1, max = 100, message = "Wisdom must be between 1 and 100"))]
    pub wisdom: i32,
    #[validate(range(min = 1, max = 100, message = "Charisma must be between 1 and 100"))]
    pub charisma: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl Attributes {
    pub const NAMES: [&'static str; 6] = [
        "strength",
        "dexterity",
        "constitution",
        "intelligence",
        "wisdom",
        "charisma",
    ];

    pub fn values(&self) -> [i32; 6] {
        [
            self.strength,
            self.dexterity,
            self.constitution,
            self.intelligence,
            self.wisdom,
            self.charisma,
        ]
    }

    pub fn total(&self) -> i64 {
        self.values().iter().map(|v| i64::from(*v)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(required(message = "Please select a race"))]
    pub race: Option<Race>,

    #[validate(required(message = "Please select a profession"))]
    pub profession: Option<Profession>,

    #[validate(nested)]
    pub attributes: Attributes,

    #[serde(default)]
    #[validate(length(max = 20, message = "An album holds at most 20 photos"))]
    pub album: Vec<PhotoRecord>,
}

impl Default for CharacterRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            race: None,
            profession: None,
            attributes: Attributes::default(),
            album: Vec::new(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length < 2 {
        return Err(ValidationError::new("name_too_short")
            .with_message("Name must be at least 2 characters".into()));
    }
    if length > 10 {
        return Err(ValidationError::new("name_too_long")
            .with_message("Name must be less than 10 characters".into()));
    }
    Ok(())
}

/// One failed rule, addressed by a dotted field path (`attributes.wisdom`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Remaining-points indicator. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointBudget {
    pub cap: u32,
    pub spent: i64,
    pub remaining: i64,
    pub over_budget: bool,
}

impl PointBudget {
    pub fn compute(attributes: &Attributes, cap: u32) -> Self {
        let spent = attributes.total();
        let remaining = i64::from(cap) - spent;
        Self {
            cap,
            spent,
            remaining,
            over_budget: remaining < 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
    pub points: PointBudget,
}

impl CharacterRecord {
    pub fn point_budget(&self, cap: u32) -> PointBudget {
        PointBudget::compute(&self.attributes, cap)
    }

    pub fn violations(&self) -> Vec<Violation> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let mut violations = Vec::new();
                collect_violations("", &errors, &mut violations);
                violations.sort_by(|a, b| a.field.cmp(&b.field));
                violations
            }
        }
    }

    /// Full structured validation result; the budget rides along but never blocks.
    pub fn validate_report(&self, point_cap: u32) -> ValidationReport {
        let violations = self.violations();
        ValidationReport {
            valid: violations.is_empty(),
            violations,
            points: self.point_budget(point_cap),
        }
    }

    pub fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Violations for a single field path or any of its children (`attributes` covers
/// `attributes.strength`).
pub fn validate_field(record: &CharacterRecord, field: &str) -> Vec<Violation> {
    let nested_prefix = format!("{}.", field);
    record
        .violations()
        .into_iter()
        .filter(|v| v.field == field || v.field.starts_with(&nested_prefix))
        .collect()
}

fn collect_violations(prefix: &str, errors: &ValidationErrors, out: &mut Vec<Violation>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push(Violation {
                        field: path.clone(),
                        code: error.code.to_string(),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", path)),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_violations(&format!("{}.", path), nested, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_violations(&format!("{}[{}].", path, index), nested, out);
                }
            }
        }
    }
}
