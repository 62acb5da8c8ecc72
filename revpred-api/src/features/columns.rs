//! Column name reconciliation for loosely-named input
//!
//! Raw headers are canonicalized (trim, lowercase, spaces removed) and looked
//! up in a fixed alias table. The lookup runs once per table, producing a
//! [`ColumnMap`] from input field to source column index.

use tracing::warn;

/// Raw input fields recognised in caller-supplied records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    EmployeeCount,
    CompanyAge,
    CompanyType,
    Category,
    City,
    State,
    Revenue,
}

impl InputField {
    pub const ALL: [InputField; 7] = [
        InputField::EmployeeCount,
        InputField::CompanyAge,
        InputField::CompanyType,
        InputField::Category,
        InputField::City,
        InputField::State,
        InputField::Revenue,
    ];

    /// Exact field name the model schema and the JSON API use
    pub fn schema_name(self) -> &'static str {
        match self {
            InputField::EmployeeCount => "employeeCount",
            InputField::CompanyAge => "companyAge",
            InputField::CompanyType => "companyType",
            InputField::Category => "category",
            InputField::City => "city",
            InputField::State => "state",
            InputField::Revenue => "revenue",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Canonical alias -> field. Keys are already in canonical form.
const ALIASES: [(&str, InputField); 7] = [
    ("employeecount", InputField::EmployeeCount),
    ("companyage", InputField::CompanyAge),
    ("companytype", InputField::CompanyType),
    ("category", InputField::Category),
    ("city", InputField::City),
    ("state", InputField::State),
    ("revenue", InputField::Revenue),
];

/// Canonical form of a raw column name: trimmed, lowercased, spaces removed
pub fn canonical_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "")
}

/// Field a raw column name refers to, if any
pub fn lookup(raw: &str) -> Option<InputField> {
    let key = canonical_key(raw);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| *field)
}

/// Source column index for each input field of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    slots: [Option<usize>; 7],
}

impl ColumnMap {
    /// Resolve headers against the alias table
    ///
    /// When several headers canonicalize to the same field the first one wins.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut map = ColumnMap::default();
        for (index, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            let Some(field) = lookup(header) else {
                continue;
            };
            match map.slots[field.slot()] {
                Some(first) => warn!(
                    "Column '{}' duplicates {} (already read from column {}); ignoring it",
                    header,
                    field.schema_name(),
                    first
                ),
                None => map.slots[field.slot()] = Some(index),
            }
        }
        map
    }

    /// Column index for `field`
    pub fn get(&self, field: InputField) -> Option<usize> {
        self.slots[field.slot()]
    }

    /// Fields from `required` that no header maps to
    pub fn missing(&self, required: &[InputField]) -> Vec<InputField> {
        required
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }
}
