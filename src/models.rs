use std::fmt;

/// Recognized QIF fields, in the order they are back-filled on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Date,
    Amount,
    Payee,
    Category,
    Number,
    Memo,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Date,
        Field::Amount,
        Field::Payee,
        Field::Category,
        Field::Number,
        Field::Memo,
    ];

    /// Single-letter line prefix used in QIF files.
    pub fn tag(&self) -> char {
        match self {
            Self::Date => 'D',
            Self::Amount => 'T',
            Self::Payee => 'P',
            Self::Category => 'L',
            Self::Number => 'N',
            Self::Memo => 'M',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Payee => "payee",
            Self::Category => "category",
            Self::Number => "number",
            Self::Memo => "memo",
        }
    }

    pub fn from_tag(tag: char) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of the synthetic provenance attribute. Matchable, never dumped.
pub const FILENAME: &str = "filename";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Field { field: Field, value: Option<String> },
    /// Unrecognized line, keyed by its position in the source file.
    Line { index: usize, text: String },
}

/// A QIF record. Entries keep the order they had in the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub entries: Vec<Entry>,
    pub filename: String,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete record from field/value pairs.
    #[cfg(test)]
    pub fn with_fields(fields: &[(Field, &str)]) -> Self {
        let mut txn = Self::new();
        for (field, value) in fields {
            txn.set(*field, Some(value.to_string()));
        }
        txn.backfill();
        txn
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            Entry::Field { field: f, value } if *f == field => value.as_deref(),
            _ => None,
        })
    }

    /// Overwrite a field in place, or append it if the record lacks it.
    pub fn set(&mut self, field: Field, value: Option<String>) {
        for entry in &mut self.entries {
            if let Entry::Field { field: f, value: v } = entry {
                if *f == field {
                    *v = value;
                    return;
                }
            }
        }
        self.entries.push(Entry::Field { field, value });
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, Entry::Field { field: f, .. } if *f == field))
    }

    pub fn push_line(&mut self, index: usize, text: String) {
        self.entries.push(Entry::Line { index, text });
    }

    /// Append every recognized field the record lacks, with no value.
    pub fn backfill(&mut self) {
        for field in Field::ALL {
            if !self.has_field(field) {
                self.entries.push(Entry::Field { field, value: None });
            }
        }
    }

    /// Value of a field looked up by lowercase name, including `filename`.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if name == FILENAME {
            return Some(self.filename.as_str()).filter(|s| !s.is_empty());
        }
        Field::from_name(name).and_then(|f| self.get(f))
    }

    pub fn payee(&self) -> Option<&str> {
        self.get(Field::Payee).filter(|p| !p.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.get(Field::Category).filter(|c| !c.is_empty())
    }
}
