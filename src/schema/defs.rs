//! Parsed schema definitions, before they are indexed into a dictionary.

/// Where a definition sits relative to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member (or, at top level, a full dotted path).
    Member(String),
    /// The element of an array; contributes `[]` to the path.
    Element,
}

/// Enum table key: JSON+ enums are keyed by integer or by string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumKey {
    Int(i64),
    Str(String),
}

/// External parser reference: command and argument template (`%name%`, `%value%`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserRef {
    pub command: String,
    pub args: String,
}

/// One `field` or `element` definition with its nested definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub segment: Segment,
    pub type_name: String,
    pub info: Option<String>,
    pub display: Option<String>,
    pub enum_values: Vec<(EnumKey, String)>,
    pub parser: Option<ParserRef>,
    pub case_insensitive: bool,
    pub children: Vec<FieldDef>,
}

impl FieldDef {
    pub fn new(segment: Segment, type_name: &str) -> Self {
        FieldDef {
            segment,
            type_name: type_name.to_string(),
            info: None,
            display: None,
            enum_values: Vec::new(),
            parser: None,
            case_insensitive: false,
            children: Vec::new(),
        }
    }

    pub fn member(name: &str, type_name: &str) -> Self {
        Self::new(Segment::Member(name.to_string()), type_name)
    }

    pub fn element(type_name: &str) -> Self {
        Self::new(Segment::Element, type_name)
    }

    pub fn with_child(mut self, child: FieldDef) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_info(mut self, info: &str) -> Self {
        self.info = Some(info.to_string());
        self
    }

    pub fn with_display(mut self, hint: &str) -> Self {
        self.display = Some(hint.to_string());
        self
    }

    pub fn with_enum(mut self, key: EnumKey, label: &str) -> Self {
        self.enum_values.push((key, label.to_string()));
        self
    }

    pub fn with_parser(mut self, command: &str, args: &str) -> Self {
        self.parser = Some(ParserRef { command: command.to_string(), args: args.to_string() });
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}
