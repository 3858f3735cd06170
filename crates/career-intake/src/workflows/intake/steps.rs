use serde::{Deserialize, Serialize};

/// A single screen's worth of record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ProfilePicture,
    Name,
    DateOfBirth,
    NationalInsurance,
    NhsNumber,
    Education,
    CurrentEmployment,
    PreviousEmployment,
    Role,
    Contact,
    Availability,
    Disability,
    Referees,
    Documents,
    Declarations,
    Review,
}

impl Section {
    pub const fn label(self) -> &'static str {
        match self {
            Section::ProfilePicture => "Profile picture",
            Section::Name => "Name",
            Section::DateOfBirth => "Date of birth",
            Section::NationalInsurance => "National Insurance number",
            Section::NhsNumber => "NHS number",
            Section::Education => "Education",
            Section::CurrentEmployment => "Current employment",
            Section::PreviousEmployment => "Previous employment",
            Section::Role => "Role",
            Section::Contact => "Contact details",
            Section::Availability => "Availability",
            Section::Disability => "Disability and adjustments",
            Section::Referees => "Referees",
            Section::Documents => "Documents",
            Section::Declarations => "Declarations",
            Section::Review => "Review",
        }
    }

    /// Record keys (as serialized) that a merge of this section may write.
    pub const fn owned_fields(self) -> &'static [&'static str] {
        match self {
            Section::ProfilePicture => &["profilePictureUrl"],
            Section::Name => &["title", "firstName", "middleName", "lastName"],
            Section::DateOfBirth => &["dateOfBirth"],
            Section::NationalInsurance => &["nationalInsuranceNumber"],
            Section::NhsNumber => &["nhsNumber"],
            Section::Education => &["education"],
            Section::CurrentEmployment => &["isEmployed", "currentEmployment"],
            Section::PreviousEmployment => &["previousEmployments"],
            Section::Role => &["positionAppliedFor", "preferredStartDate"],
            Section::Contact => &[
                "email",
                "phone",
                "address",
                "hasPreviousAddress",
                "previousAddress",
            ],
            Section::Availability => &["availability"],
            Section::Disability => &[
                "hasDisability",
                "disabilityDetails",
                "needsReasonableAdjustment",
                "reasonableAdjustmentDetails",
            ],
            Section::Referees => &["referees"],
            Section::Documents | Section::Review => &[],
            Section::Declarations => &["declarations"],
        }
    }
}

/// Top-level steps of the application wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ProfilePicture,
    PersonalDetails,
    Education,
    Employment,
    ApplicationDetails,
    Disability,
    Referees,
    DocumentDeclaration,
    Review,
}

impl Step {
    pub const fn label(self) -> &'static str {
        match self {
            Step::ProfilePicture => "Profile picture",
            Step::PersonalDetails => "Personal details",
            Step::Education => "Education",
            Step::Employment => "Employment",
            Step::ApplicationDetails => "Application details",
            Step::Disability => "Disability",
            Step::Referees => "Referees",
            Step::DocumentDeclaration => "Documents and declarations",
            Step::Review => "Review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Simple,
    Composite,
}

/// One screen within a step; composite steps hold several, simple steps exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDescriptor {
    pub section: Section,
    pub label: &'static str,
    pub owned_fields: &'static [&'static str],
    pub skippable: bool,
}

impl ScreenDescriptor {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            label: section.label(),
            owned_fields: section.owned_fields(),
            skippable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub position: usize,
    pub step: Step,
    pub label: &'static str,
    pub kind: StepKind,
    pub screens: Vec<ScreenDescriptor>,
}

impl StepDescriptor {
    pub fn simple(position: usize, step: Step, section: Section) -> Self {
        Self {
            position,
            step,
            label: step.label(),
            kind: StepKind::Simple,
            screens: vec![ScreenDescriptor::new(section)],
        }
    }

    pub fn composite(position: usize, step: Step, sections: &[Section]) -> Self {
        Self {
            position,
            step,
            label: step.label(),
            kind: StepKind::Composite,
            screens: sections.iter().copied().map(ScreenDescriptor::new).collect(),
        }
    }

    /// Mark every screen of this step as offering a skip outcome.
    pub fn skippable(mut self) -> Self {
        for screen in &mut self.screens {
            screen.skippable = true;
        }
        self
    }

    pub fn has_sub_steps(&self) -> bool {
        self.kind == StepKind::Composite
    }

    pub fn sub_step_count(&self) -> Option<usize> {
        self.has_sub_steps().then_some(self.screens.len())
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.screens
            .iter()
            .flat_map(|screen| screen.owned_fields.iter().copied())
            .collect()
    }

    /// Cursor landing on this step when entered going forward.
    pub fn entry_cursor(&self) -> Cursor {
        Cursor {
            position: self.position,
            sub_position: self.has_sub_steps().then_some(1),
        }
    }
}

/// Position within the wizard: a 1-indexed step and, for composite steps, a 1-indexed sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_position: Option<usize>,
}

impl Cursor {
    pub const fn at(position: usize) -> Self {
        Self {
            position,
            sub_position: None,
        }
    }

    pub const fn at_sub(position: usize, sub_position: usize) -> Self {
        Self {
            position,
            sub_position: Some(sub_position),
        }
    }
}

/// Malformed step tables and out-of-range cursors; both are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepTableError {
    #[error("step table has no steps")]
    Empty,
    #[error("step position {found} appears where position {expected} was expected")]
    NonContiguous { expected: usize, found: usize },
    #[error("step position {0} is declared more than once")]
    DuplicatePosition(usize),
    #[error("simple step {position} must have exactly one screen, found {found}")]
    SimpleStepScreens { position: usize, found: usize },
    #[error("composite step {0} declares no sub-steps")]
    EmptyComposite(usize),
    #[error("section {0:?} is collected by more than one screen")]
    DuplicateSection(Section),
    #[error("cursor {0:?} does not address a screen in the step table")]
    OutOfRange(Cursor),
}

/// Ordered, validated list of steps.
#[derive(Debug, Clone, Serialize)]
pub struct StepTable {
    steps: Vec<StepDescriptor>,
}

impl StepTable {
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, StepTableError> {
        if steps.is_empty() {
            return Err(StepTableError::Empty);
        }

        let mut seen_sections = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            let expected = index + 1;
            if step.position != expected {
                if steps[..index].iter().any(|prior| prior.position == step.position) {
                    return Err(StepTableError::DuplicatePosition(step.position));
                }
                return Err(StepTableError::NonContiguous {
                    expected,
                    found: step.position,
                });
            }

            match step.kind {
                StepKind::Simple if step.screens.len() != 1 => {
                    return Err(StepTableError::SimpleStepScreens {
                        position: step.position,
                        found: step.screens.len(),
                    });
                }
                StepKind::Composite if step.screens.is_empty() => {
                    return Err(StepTableError::EmptyComposite(step.position));
                }
                _ => {}
            }

            for screen in &step.screens {
                if seen_sections.contains(&screen.section) {
                    return Err(StepTableError::DuplicateSection(screen.section));
                }
                seen_sections.push(screen.section);
            }
        }

        Ok(Self { steps })
    }

    /// The canonical nine-step application wizard.
    pub fn standard() -> Self {
        Self::new(standard_steps()).expect("standard step table is well formed")
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn descriptor_at(&self, position: usize) -> Option<&StepDescriptor> {
        position
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
    }

    pub fn screen_at(&self, cursor: Cursor) -> Result<&ScreenDescriptor, StepTableError> {
        let step = self
            .descriptor_at(cursor.position)
            .ok_or(StepTableError::OutOfRange(cursor))?;

        let index = match (step.kind, cursor.sub_position) {
            (StepKind::Simple, None) => 0,
            (StepKind::Composite, Some(sub)) if sub >= 1 => sub - 1,
            _ => return Err(StepTableError::OutOfRange(cursor)),
        };

        step.screens
            .get(index)
            .ok_or(StepTableError::OutOfRange(cursor))
    }

    pub fn initial_cursor(&self) -> Cursor {
        self.steps
            .first()
            .map(StepDescriptor::entry_cursor)
            .unwrap_or(Cursor::at(1))
    }

    pub fn position_of(&self, section: Section) -> Option<Cursor> {
        self.steps.iter().find_map(|step| {
            step.screens
                .iter()
                .position(|screen| screen.section == section)
                .map(|index| Cursor {
                    position: step.position,
                    sub_position: step.has_sub_steps().then_some(index + 1),
                })
        })
    }
}

fn standard_steps() -> Vec<StepDescriptor> {
    vec![
        StepDescriptor::simple(1, Step::ProfilePicture, Section::ProfilePicture).skippable(),
        StepDescriptor::composite(
            2,
            Step::PersonalDetails,
            &[
                Section::Name,
                Section::DateOfBirth,
                Section::NationalInsurance,
                Section::NhsNumber,
            ],
        ),
        StepDescriptor::simple(3, Step::Education, Section::Education),
        StepDescriptor::composite(
            4,
            Step::Employment,
            &[Section::CurrentEmployment, Section::PreviousEmployment],
        ),
        StepDescriptor::composite(
            5,
            Step::ApplicationDetails,
            &[Section::Role, Section::Contact, Section::Availability],
        ),
        StepDescriptor::simple(6, Step::Disability, Section::Disability),
        StepDescriptor::simple(7, Step::Referees, Section::Referees),
        StepDescriptor::composite(
            8,
            Step::DocumentDeclaration,
            &[Section::Documents, Section::Declarations],
        ),
        StepDescriptor::simple(9, Step::Review, Section::Review),
    ]
}
